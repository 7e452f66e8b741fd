use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(
    name = "cinecast",
    about = "DLNA movie server — serve a directory of movies to TVs and cast to them",
    long_about = None,
    version = env!("GIT_VERSION"),
)]
pub struct Args {
    /// Directories containing movie files (overrides MEDIA_PATH / MEDIA_PATHS)
    #[arg(num_args = 0..)]
    pub paths: Vec<PathBuf>,

    /// HTTP port to listen on [default: 8080]
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Friendly server name shown on DLNA client device lists
    #[arg(short, long)]
    pub name: Option<String>,

    /// Path to TOML config file (overrides default search: ./cinecast.toml, ~/.config/cinecast/config.toml)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}
