use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "snapfeed", about = "A small media feed server backed by a CDN")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub cdn: CdnConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

/// Local staging for uploads before they are handed to the CDN.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub temp_dir: Option<PathBuf>,
    pub max_upload_bytes: usize,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: Option<String>,
    pub token_lifetime_secs: i64,
    pub reset_token_lifetime_secs: i64,
    pub verify_token_lifetime_secs: i64,
    pub require_verification: bool,
    pub password_hash_cost: u32,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct CdnConfig {
    pub upload_url: String,
    pub public_key: Option<String>,
    pub private_key: Option<String>,
    pub url_endpoint: Option<String>,
    pub folder: Option<String>,
    pub tag: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            temp_dir: None,
            max_upload_bytes: 100 * 1024 * 1024,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_lifetime_secs: 3600,
            reset_token_lifetime_secs: 3600,
            verify_token_lifetime_secs: 3600,
            require_verification: false,
            password_hash_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl Default for CdnConfig {
    fn default() -> Self {
        Self {
            upload_url: "https://upload.imagekit.io/api/v1/files/upload".to_string(),
            public_key: None,
            private_key: None,
            url_endpoint: None,
            folder: None,
            tag: "backend-upload".to_string(),
        }
    }
}

impl CdnConfig {
    /// Account settings still unset. Only the private key is needed to
    /// upload; the public key and URL endpoint identify the ImageKit account.
    pub fn missing_settings(&self) -> Vec<&'static str> {
        [
            ("cdn.public_key", &self.public_key),
            ("cdn.private_key", &self.private_key),
            ("cdn.url_endpoint", &self.url_endpoint),
        ]
        .into_iter()
        .filter(|(_, value)| value.as_deref().map_or(true, str::is_empty))
        .map(|(name, _)| name)
        .collect()
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli);
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        config.apply_env(|key| std::env::var(key).ok());

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }

        // Resolve paths relative to data dir
        if config.database.path.is_none() {
            config.database.path = Some(data_dir.join("snapfeed.db"));
        }
        if config.storage.temp_dir.is_none() {
            config.storage.temp_dir = Some(data_dir.join("tmp"));
        }

        Ok(config)
    }

    /// Secrets that usually live outside the config file. A value from the
    /// environment replaces whatever the file set.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(secret) = lookup("SNAPFEED_JWT_SECRET") {
            self.auth.jwt_secret = Some(secret);
        }
        if let Some(key) = lookup("IMAGEKIT_PRIVATE_KEY") {
            self.cdn.private_key = Some(key);
        }
        if let Some(key) = lookup("IMAGEKIT_PUBLIC_KEY") {
            self.cdn.public_key = Some(key);
        }
        if let Some(endpoint) = lookup("IMAGEKIT_URL_ENDPOINT") {
            self.cdn.url_endpoint = Some(endpoint);
        }
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".snapfeed")
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("snapfeed.db"))
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.storage
            .temp_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_with(data_dir: PathBuf) -> Cli {
        Cli {
            config: None,
            host: None,
            port: None,
            data_dir: Some(data_dir),
        }
    }

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.auth.token_lifetime_secs, 3600);
        assert!(!config.auth.require_verification);
        assert_eq!(config.cdn.tag, "backend-upload");
        assert_eq!(config.storage.max_upload_bytes, 100 * 1024 * 1024);
        assert!(config.database.path.is_none());
        assert!(config.auth.jwt_secret.is_none());
    }

    #[test]
    fn data_dir_uses_cli_override() {
        let cli = cli_with(PathBuf::from("/tmp/test-snapfeed"));
        assert_eq!(Config::data_dir(&cli), PathBuf::from("/tmp/test-snapfeed"));
    }

    #[test]
    fn data_dir_defaults_to_home_dot_snapfeed() {
        let cli = Cli {
            config: None,
            host: None,
            port: None,
            data_dir: None,
        };
        assert!(Config::data_dir(&cli).ends_with(".snapfeed"));
    }

    #[test]
    fn load_with_no_config_file_resolves_paths_under_data_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load(&cli_with(tmp.path().to_path_buf())).unwrap();
        assert_eq!(config.db_path(), tmp.path().join("snapfeed.db"));
        assert_eq!(config.temp_dir(), tmp.path().join("tmp"));
    }

    #[test]
    fn load_reads_toml_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
host = "127.0.0.1"
port = 9000

[auth]
token_lifetime_secs = 60
require_verification = true

[cdn]
tag = "mobile-upload"
folder = "/feed"
"#,
        )
        .unwrap();

        let cli = Cli {
            config: Some(config_path),
            host: None,
            port: None,
            data_dir: Some(tmp.path().to_path_buf()),
        };
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.auth.token_lifetime_secs, 60);
        assert!(config.auth.require_verification);
        assert_eq!(config.cdn.tag, "mobile-upload");
        assert_eq!(config.cdn.folder.as_deref(), Some("/feed"));
        // Untouched sections keep their defaults
        assert_eq!(config.auth.reset_token_lifetime_secs, 3600);
    }

    #[test]
    fn cli_overrides_beat_toml_values() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
host = "192.168.1.1"
port = 9000
"#,
        )
        .unwrap();

        let cli = Cli {
            config: Some(config_path),
            host: Some("10.0.0.1".to_string()),
            port: Some(4000),
            data_dir: Some(tmp.path().to_path_buf()),
        };
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.host, "10.0.0.1");
        assert_eq!(config.server.port, 4000);
    }

    #[test]
    fn env_secrets_replace_file_values() {
        let mut config = Config::default();
        config.cdn.private_key = Some("from-file".into());
        config.apply_env(|key| match key {
            "IMAGEKIT_PRIVATE_KEY" => Some("from-env".into()),
            "SNAPFEED_JWT_SECRET" => Some("s3cret".into()),
            _ => None,
        });
        assert_eq!(config.cdn.private_key.as_deref(), Some("from-env"));
        assert_eq!(config.auth.jwt_secret.as_deref(), Some("s3cret"));
        assert!(config.cdn.public_key.is_none());
    }

    #[test]
    fn missing_cdn_settings_are_reported() {
        let mut config = Config::default();
        assert_eq!(
            config.cdn.missing_settings(),
            vec!["cdn.public_key", "cdn.private_key", "cdn.url_endpoint"]
        );

        config.apply_env(|key| match key {
            "IMAGEKIT_PUBLIC_KEY" => Some("public_abc".into()),
            "IMAGEKIT_URL_ENDPOINT" => Some("https://ik.imagekit.io/demo".into()),
            "IMAGEKIT_PRIVATE_KEY" => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.cdn.public_key.as_deref(), Some("public_abc"));
        assert_eq!(config.cdn.missing_settings(), vec!["cdn.private_key"]);

        config.cdn.private_key = Some("private_xyz".into());
        assert!(config.cdn.missing_settings().is_empty());
    }
}
