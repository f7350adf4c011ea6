use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Deserialize, Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub jwt_secret: String,

    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialServerConfig {
    database_url: Option<String>,
    jwt_secret: Option<String>,
    listen_addr: Option<String>,
    log_dir: Option<String>,
    max_connections: Option<u32>,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_max_connections() -> u32 {
    10
}

impl ServerConfig {
    /// Loads the optional TOML file, then the environment (after `.env`).
    /// Environment variables override values from the file.
    pub fn load(config_path: Option<&str>) -> Result<Self, String> {
        dotenv::dotenv().ok();

        let file_config = match config_path {
            Some(path_str) => read_file(Path::new(path_str))?,
            None => PartialServerConfig::default(),
        };

        let env_config: PartialServerConfig = envy::from_env::<PartialServerConfig>()
            .map_err(|e| format!("Failed to load config from environment: {e}"))?;

        Self::merge(file_config, env_config)
    }

    fn merge(file_config: PartialServerConfig, env_config: PartialServerConfig) -> Result<Self, String> {
        Ok(ServerConfig {
            database_url: env_config
                .database_url
                .or(file_config.database_url)
                .ok_or("DATABASE_URL is required")?,
            jwt_secret: env_config
                .jwt_secret
                .or(file_config.jwt_secret)
                .ok_or("JWT_SECRET is required")?,
            listen_addr: env_config
                .listen_addr
                .or(file_config.listen_addr)
                .unwrap_or_else(default_listen_addr),
            log_dir: env_config
                .log_dir
                .or(file_config.log_dir)
                .unwrap_or_else(default_log_dir),
            max_connections: env_config
                .max_connections
                .or(file_config.max_connections)
                .unwrap_or_else(default_max_connections),
        })
    }
}

/// A missing file is treated as empty.
fn read_file(path: &Path) -> Result<PartialServerConfig, String> {
    if !path.exists() {
        return Ok(PartialServerConfig::default());
    }
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file at {path:?}: {e}"))?;
    toml::from_str(&contents).map_err(|e| format!("Failed to parse TOML from config file at {path:?}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(vars: &[(&str, &str)]) -> PartialServerConfig {
        envy::from_iter(vars.iter().map(|(k, v)| (k.to_string(), v.to_string()))).unwrap()
    }

    #[test]
    fn test_file_values_and_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "database_url = \"sqlite://foodgram.db\"").unwrap();
        writeln!(file, "jwt_secret = \"from-file\"").unwrap();
        writeln!(file, "max_connections = 3").unwrap();

        let file_config = read_file(file.path()).unwrap();
        let config = ServerConfig::merge(file_config, env(&[])).unwrap();
        assert_eq!(config.database_url, "sqlite://foodgram.db");
        assert_eq!(config.jwt_secret, "from-file");
        assert_eq!(config.max_connections, 3);
        assert_eq!(config.listen_addr, "0.0.0.0:8000");
        assert_eq!(config.log_dir, "logs");
    }

    #[test]
    fn test_environment_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "database_url = \"sqlite://foodgram.db\"").unwrap();
        writeln!(file, "jwt_secret = \"from-file\"").unwrap();

        let file_config = read_file(file.path()).unwrap();
        let env_config = env(&[("JWT_SECRET", "from-env"), ("LISTEN_ADDR", "127.0.0.1:9000")]);
        let config = ServerConfig::merge(file_config, env_config).unwrap();
        assert_eq!(config.jwt_secret, "from-env");
        assert_eq!(config.listen_addr, "127.0.0.1:9000");
        assert_eq!(config.database_url, "sqlite://foodgram.db");
    }

    #[test]
    fn test_required_values() {
        let err = ServerConfig::merge(PartialServerConfig::default(), env(&[("JWT_SECRET", "s")])).unwrap_err();
        assert!(err.contains("DATABASE_URL"));
        let missing = read_file(Path::new("/nonexistent/foodgram.toml")).unwrap();
        assert!(missing.database_url.is_none());
    }
}
