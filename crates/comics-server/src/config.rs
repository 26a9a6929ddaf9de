use std::{path::PathBuf, time::Duration};

use crate::error::Result;
pub use clap::Parser;

#[derive(Debug, Clone, clap::Parser)]
pub struct ServerConfig {
    #[arg(
        short,
        long,
        default_value_t = 4000,
        env = "COMICS_LISTEN_PORT",
        help = "Port to listen on"
    )]
    pub port: u16,
    #[arg(
        short,
        long,
        default_value = "127.0.0.1",
        env = "COMICS_LISTEN_ADDRESS",
        help = "Address to listen on"
    )]
    pub listen_address: String,

    #[arg(
        long,
        env = "COMICS_DATABASE_URL",
        help = "Database URL e.g. sqlite://file.db, default is sqlite://[data-dir]/comics.db, where data-dir is set by --data-dir"
    )]
    database_url: Option<String>,

    #[arg(
        long,
        env = "COMICS_DATA_DIR",
        help = "Data directory for the database, default is system default like ~/.local/share/comics",
        default_value_t = default_data_dir()
    )]
    data_dir: String,

    #[arg(
        long,
        env = "COMICS_DEFAULT_PAGE_SIZE",
        default_value = "20",
        help = "Page size used when a listing does not ask for one"
    )]
    pub default_page_size: u32,

    #[arg(
        long,
        env = "COMICS_STORE_TIMEOUT",
        default_value = "3s",
        help = "Deadline for a single database operation in human friendly format (e.g. 3s, 500ms)",
        value_parser = humantime::parse_duration
    )]
    pub store_timeout: Duration,

    #[arg(
        long = "api-token",
        env = "COMICS_API_TOKENS",
        value_delimiter = ';',
        help = "Accepted bearer token with its permissions as TOKEN=perm[,perm...], can be repeated. Without any token all requests are allowed"
    )]
    pub api_tokens: Vec<String>,

    #[arg(long, env = "COMICS_CORS", help = "Enable permissive CORS")]
    pub cors: bool,
}

fn default_data_dir() -> String {
    dirs::data_dir()
        .map(|p| p.join("comics"))
        .unwrap_or_else(|| PathBuf::from("comics"))
        .to_string_lossy()
        .to_string()
}

impl ServerConfig {
    pub fn load() -> Result<Self> {
        ServerConfig::try_parse().map_err(|e| e.into())
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    pub fn database_url(&self) -> String {
        self.database_url
            .clone()
            .unwrap_or_else(|| format!("sqlite://{}/comics.db", self.data_dir))
    }
}
