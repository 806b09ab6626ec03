use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP port the server listens on.
    pub port: u16,
    /// Static cap on concurrent authenticated sessions.
    pub max_sessions: usize,
    /// Path of the SQLite database file.
    pub db_path: PathBuf,
    /// Path of the append-only activity log.
    pub log_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            max_sessions: 10,
            db_path: PathBuf::from("palaver.db"),
            log_path: PathBuf::from("palaver.log"),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(port) = std::env::var("PALAVER_PORT") {
            if let Ok(parsed) = port.parse::<u16>() {
                config.port = parsed;
            } else {
                tracing::warn!(value = %port, "Invalid PALAVER_PORT, using default");
            }
        }

        if let Ok(cap) = std::env::var("PALAVER_MAX_SESSIONS") {
            if let Ok(parsed) = cap.parse::<usize>() {
                config.max_sessions = parsed;
            } else {
                tracing::warn!(value = %cap, "Invalid PALAVER_MAX_SESSIONS, using default");
            }
        }

        if let Ok(path) = std::env::var("PALAVER_DB") {
            config.db_path = PathBuf::from(path);
        }

        if let Ok(path) = std::env::var("PALAVER_LOG") {
            config.log_path = PathBuf::from(path);
        }

        config
    }
}
