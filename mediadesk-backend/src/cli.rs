//! Cli things
//!

use std::path::PathBuf;

use clap::Parser;

fn default_path(name: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&format!("~/.cache/mediadesk/{}", name)).to_string())
}

pub fn db_path_default() -> PathBuf {
    default_path("mediadesk.sqlite3")
}

pub fn blob_path_default() -> PathBuf {
    default_path("content")
}

pub fn cache_path_default() -> PathBuf {
    default_path("cache")
}

#[derive(Parser, Debug)]
pub struct CliOpts {
    #[clap(long, help = "Path to the database file", env = "MEDIADESK_DB_PATH")]
    pub db_path: Option<PathBuf>,

    #[clap(long, help = "Directory uploaded files are stored in", env = "MEDIADESK_BLOB_PATH")]
    pub blob_path: Option<PathBuf>,

    #[clap(long, help = "Directory for thumbnails and other derived files", env = "MEDIADESK_CACHE_PATH")]
    pub cache_path: Option<PathBuf>,

    #[clap(long, help = "Enable debug logging")]
    pub debug: bool,
}

/// Where everything lives, handed to [crate::AppState::new]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub blob_path: PathBuf,
    pub cache_path: PathBuf,
}

impl From<&CliOpts> for AppConfig {
    fn from(cli: &CliOpts) -> Self {
        Self {
            db_path: cli.db_path.clone().unwrap_or_else(db_path_default),
            blob_path: cli.blob_path.clone().unwrap_or_else(blob_path_default),
            cache_path: cli.cache_path.clone().unwrap_or_else(cache_path_default),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_cli() {
        let cli = CliOpts::parse_from([
            "mediadesk",
            "--db-path",
            "/tmp/md.sqlite3",
            "--blob-path",
            "/tmp/blobs",
            "--debug",
        ]);
        assert!(cli.debug);

        let config = AppConfig::from(&cli);
        assert_eq!(config.db_path, PathBuf::from("/tmp/md.sqlite3"));
        assert_eq!(config.blob_path, PathBuf::from("/tmp/blobs"));
        assert!(config.cache_path.ends_with("mediadesk/cache"));
    }
}
