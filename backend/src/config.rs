//! Application configuration
//!
//! Centralized configuration management with environment variable support
//! and sensible defaults.

use std::env;
use std::path::PathBuf;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// CSV batch loader configuration
    pub loader: LoaderConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind the server to
    pub port: u16,
    /// Host address to bind to
    pub host: String,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// SQLite connection URL (e.g. `sqlite:data/enem.db` or `sqlite::memory:`)
    pub url: String,
}

/// Text encoding of the CSV snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvEncoding {
    /// UTF-8 (pandas-exported samples)
    Utf8,
    /// Latin-1 / Windows-1252 (raw INEP microdata)
    Latin1,
}

impl CsvEncoding {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "latin1" | "latin-1" | "iso-8859-1" | "windows-1252" | "cp1252" => Self::Latin1,
            _ => Self::Utf8,
        }
    }
}

/// CSV batch loader configuration
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Directory holding the CSV snapshot
    pub data_dir: PathBuf,
    /// File name of the participants CSV
    pub participantes_file: String,
    /// File name of the results CSV
    pub resultados_file: String,
    /// Field delimiter
    pub delimiter: u8,
    /// File encoding
    pub encoding: CsvEncoding,
    /// Whether the admin load endpoint is allowed to run
    pub enabled: bool,
    /// Run the load once before the server starts accepting requests
    pub load_on_startup: bool,
}

impl LoaderConfig {
    /// Full path of the participants CSV
    pub fn participantes_path(&self) -> PathBuf {
        self.data_dir.join(&self.participantes_file)
    }

    /// Full path of the results CSV
    pub fn resultados_path(&self) -> PathBuf {
        self.data_dir.join(&self.resultados_file)
    }

    /// Both CSV files are present on disk
    pub fn files_present(&self) -> bool {
        self.participantes_path().exists() && self.resultados_path().exists()
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8000),
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:data/enem.db".to_string()),
            },
            loader: LoaderConfig {
                data_dir: PathBuf::from(env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string())),
                participantes_file: env::var("PARTICIPANTES_CSV")
                    .unwrap_or_else(|_| "amostra_participantes.csv".to_string()),
                resultados_file: env::var("RESULTADOS_CSV")
                    .unwrap_or_else(|_| "amostra_resultados.csv".to_string()),
                delimiter: env::var("CSV_DELIMITER")
                    .ok()
                    .and_then(|d| d.bytes().next())
                    .unwrap_or(b','),
                encoding: env::var("CSV_ENCODING")
                    .map(|e| CsvEncoding::parse(&e))
                    .unwrap_or(CsvEncoding::Utf8),
                enabled: env_flag("ENABLE_DATA_LOAD"),
                load_on_startup: env_flag("LOAD_DATA_ON_STARTUP"),
            },
        }
    }

    /// Get the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 9] = [
        "PORT",
        "HOST",
        "DATABASE_URL",
        "DATA_DIR",
        "CSV_DELIMITER",
        "CSV_ENCODING",
        "ENABLE_DATA_LOAD",
        "LOAD_DATA_ON_STARTUP",
        "PARTICIPANTES_CSV",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = Config::from_env();
        assert_eq!(config.server_addr(), "0.0.0.0:8000");
        assert_eq!(config.database.url, "sqlite:data/enem.db");
        assert_eq!(config.loader.delimiter, b',');
        assert_eq!(config.loader.encoding, CsvEncoding::Utf8);
        assert!(!config.loader.enabled);
        assert!(!config.loader.load_on_startup);
        assert_eq!(
            config.loader.participantes_path(),
            PathBuf::from("data/amostra_participantes.csv")
        );
    }

    #[test]
    #[serial]
    fn test_overrides() {
        clear_env();
        env::set_var("PORT", "9100");
        env::set_var("CSV_DELIMITER", ";");
        env::set_var("CSV_ENCODING", "latin1");
        env::set_var("ENABLE_DATA_LOAD", "true");
        env::set_var("DATA_DIR", "/srv/enem");
        let config = Config::from_env();
        clear_env();

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.loader.delimiter, b';');
        assert_eq!(config.loader.encoding, CsvEncoding::Latin1);
        assert!(config.loader.enabled);
        assert_eq!(
            config.loader.resultados_path(),
            PathBuf::from("/srv/enem/amostra_resultados.csv")
        );
    }

    #[test]
    #[serial]
    fn test_invalid_port_falls_back() {
        clear_env();
        env::set_var("PORT", "not-a-port");
        let config = Config::from_env();
        clear_env();
        assert_eq!(config.server.port, 8000);
    }
}
