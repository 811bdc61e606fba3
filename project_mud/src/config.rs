use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use mud::SessionConfig;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    pub telnet_addr: String,
    pub max_connections: usize,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            telnet_addr: "0.0.0.0:4000".to_string(),
            max_connections: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub path: String,
    /// Keep players in memory only. Nothing survives a restart.
    pub in_memory: bool,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: "data/player.db".to_string(),
            in_memory: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    pub outbox_capacity: usize,
    pub max_input_length: usize,
    pub drain_timeout_ms: u64,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            outbox_capacity: 64,
            max_input_length: 4096,
            drain_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TemplateSection {
    /// Directory whose files override the built-in templates by name.
    pub dir: Option<String>,
}

/// Top-level MUD server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub net: NetConfig,
    pub database: DatabaseSection,
    pub session: SessionSection,
    pub templates: TemplateSection,
}

impl ServerConfig {
    /// Load configuration from an optional TOML file path.
    pub fn load(config_path: Option<&str>) -> Result<Self, Box<dyn std::error::Error>> {
        let config = match config_path {
            Some(path) if Path::new(path).exists() => {
                let content = std::fs::read_to_string(path)?;
                toml::from_str(&content)?
            }
            Some(path) => {
                tracing::warn!(path, "Config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };
        Ok(config)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            outbox_capacity: self.session.outbox_capacity,
            max_input_length: self.session.max_input_length,
            drain_timeout: Duration::from_millis(self.session.drain_timeout_ms),
        }
    }

    pub fn template_dir(&self) -> Option<PathBuf> {
        self.templates.dir.as_ref().map(PathBuf::from)
    }
}

/// Parse CLI arguments and load config.
/// Supports: --config <path>
pub fn parse_cli_args() -> ServerConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<&str> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                if let Some(val) = args.get(i + 1) {
                    config_path = Some(val.as_str());
                    i += 2;
                } else {
                    eprintln!("--config requires a path argument");
                    std::process::exit(1);
                }
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                std::process::exit(1);
            }
        }
    }

    match ServerConfig::load(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.net.telnet_addr, "0.0.0.0:4000");
        assert_eq!(config.net.max_connections, 1000);
        assert_eq!(config.database.path, "data/player.db");
        assert!(!config.database.in_memory);
        assert_eq!(config.session.outbox_capacity, 64);
        assert!(config.template_dir().is_none());
    }

    #[test]
    fn session_config_conversion() {
        let sc = ServerConfig::default().session_config();
        assert_eq!(sc.outbox_capacity, 64);
        assert_eq!(sc.max_input_length, 4096);
        assert_eq!(sc.drain_timeout, Duration::from_secs(5));
    }

    #[test]
    fn load_nonexistent_file_returns_defaults() {
        let config = ServerConfig::load(Some("/tmp/nonexistent_mud_config_12345.toml")).unwrap();
        assert_eq!(config.net.max_connections, 1000);
    }

    #[test]
    fn load_none_returns_defaults() {
        let config = ServerConfig::load(None).unwrap();
        assert_eq!(config.session.drain_timeout_ms, 5000);
    }

    #[test]
    fn load_partial_toml() {
        let mut f = NamedTempFile::new().unwrap();
        write!(
            f,
            r#"
[net]
max_connections = 8

[database]
in_memory = true

[templates]
dir = "custom"
"#
        )
        .unwrap();

        let config = ServerConfig::load(Some(f.path().to_str().unwrap())).unwrap();
        assert_eq!(config.net.max_connections, 8);
        assert_eq!(config.net.telnet_addr, "0.0.0.0:4000");
        assert!(config.database.in_memory);
        assert_eq!(config.template_dir(), Some(PathBuf::from("custom")));
    }

    #[test]
    fn malformed_toml_is_an_error() {
        let mut f = NamedTempFile::new().unwrap();
        write!(f, "[net\nmax_connections = ").unwrap();
        assert!(ServerConfig::load(Some(f.path().to_str().unwrap())).is_err());
    }
}
