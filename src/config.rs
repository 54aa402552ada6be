use std::env;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
}

impl Config {
    /// Reads settings from the process environment, falling back to defaults
    /// for anything missing or unparsable.
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| default_database_url());

        let max_connections = env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|n| n.parse().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);

        Self {
            port,
            database_url,
            max_connections,
        }
    }
}

fn default_database_url() -> String {
    if std::path::Path::new("/data").exists() {
        // Production: mounted volume
        "sqlite:/data/people_messages.db?mode=rwc".to_string()
    } else {
        std::fs::create_dir_all("./data").ok();
        "sqlite:./data/people_messages.db?mode=rwc".to_string()
    }
}
