use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub stripe: StripeConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expires_in: i64,  // seconds
    pub refresh_token_expires_in: i64, // seconds
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StripeConfig {
    #[serde(default)]
    pub secret_key: String,
    #[serde(default)]
    pub webhook_secret: String,
    /// In-process gateway, no network calls.
    #[serde(default)]
    pub mock: bool,
}

impl StripeConfig {
    pub fn is_configured(&self) -> bool {
        self.mock || !self.secret_key.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageDriver {
    #[default]
    Local,
    S3,
}

impl std::str::FromStr for StorageDriver {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(StorageDriver::Local),
            "s3" => Ok(StorageDriver::S3),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub driver: StorageDriver,
    #[serde(default = "default_local_dir")]
    pub local_dir: String,
    /// URL prefix under which the local directory is served.
    #[serde(default = "default_public_path")]
    pub public_path: String,
    #[serde(default)]
    pub s3: S3Config,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            driver: StorageDriver::Local,
            local_dir: default_local_dir(),
            public_path: default_public_path(),
            s3: S3Config::default(),
        }
    }
}

fn default_local_dir() -> String {
    "./public/uploads".to_string()
}

fn default_public_path() -> String {
    "/uploads".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct S3Config {
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
    #[serde(default)]
    pub public_url: Option<String>,
    #[serde(default)]
    pub force_path_style: bool,
}

fn get_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        let mut config: Config = match std::fs::read_to_string(&config_path) {
            Ok(config_str) => toml::from_str(&config_str)
                .map_err(|e| format!("failed to parse config file {config_path}: {e}"))?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let database_url = get_env("DATABASE_URL")
                    .ok_or("DATABASE_URL is not set and no config.toml was found")?;
                Self::from_env_defaults(database_url)
            }
            Err(e) => {
                return Err(format!("failed to read config file {config_path}: {e}").into());
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn from_env_defaults(database_url: String) -> Self {
        Config {
            server: ServerConfig {
                host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: get_env_parse("SERVER_PORT", 8080u16),
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
            },
            jwt: JwtConfig {
                secret: get_env("JWT_SECRET")
                    .unwrap_or_else(|| "change-me-in-production".to_string()),
                access_token_expires_in: get_env_parse("JWT_ACCESS_EXPIRES_IN", 7200i64),
                refresh_token_expires_in: get_env_parse("JWT_REFRESH_EXPIRES_IN", 2_592_000i64),
            },
            stripe: StripeConfig::default(),
            storage: StorageConfig::default(),
        }
    }

    /// Environment variables win over the file, even when it exists.
    fn apply_env_overrides(&mut self) {
        if let Some(v) = get_env("SERVER_HOST") {
            self.server.host = v;
        }
        if let Some(v) = get_env("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            self.server.port = p;
        }
        if let Some(v) = get_env("DATABASE_URL") {
            self.database.url = v;
        }
        if let Some(v) = get_env("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            self.database.max_connections = mc;
        }
        if let Some(v) = get_env("JWT_SECRET") {
            self.jwt.secret = v;
        }
        if let Some(v) = get_env("JWT_ACCESS_EXPIRES_IN")
            && let Ok(n) = v.parse()
        {
            self.jwt.access_token_expires_in = n;
        }
        if let Some(v) = get_env("JWT_REFRESH_EXPIRES_IN")
            && let Ok(n) = v.parse()
        {
            self.jwt.refresh_token_expires_in = n;
        }

        // Stripe
        if let Some(v) = get_env("STRIPE_SECRET_KEY") {
            self.stripe.secret_key = v;
        }
        if let Some(v) = get_env("STRIPE_WEBHOOK_SECRET") {
            self.stripe.webhook_secret = v;
        }
        if let Some(v) = get_env("STRIPE_MOCK") {
            self.stripe.mock = parse_bool(&v);
        }

        // Storage
        if let Some(v) = get_env("STORAGE_DRIVER")
            && let Ok(driver) = v.parse()
        {
            self.storage.driver = driver;
        }
        if let Some(v) = get_env("STORAGE_LOCAL_DIR") {
            self.storage.local_dir = v;
        }
        if let Some(v) = get_env("S3_BUCKET") {
            self.storage.s3.bucket = v;
        }
        if let Some(v) = get_env("S3_REGION") {
            self.storage.s3.region = Some(v);
        }
        if let Some(v) = get_env("S3_ENDPOINT") {
            self.storage.s3.endpoint = Some(v);
        }
        if let Some(v) = get_env("S3_ACCESS_KEY_ID") {
            self.storage.s3.access_key_id = Some(v);
        }
        if let Some(v) = get_env("S3_SECRET_ACCESS_KEY") {
            self.storage.s3.secret_access_key = Some(v);
        }
        if let Some(v) = get_env("S3_PUBLIC_URL") {
            self.storage.s3.public_url = Some(v);
        }
        if let Some(v) = get_env("S3_FORCE_PATH_STYLE") {
            self.storage.s3.force_path_style = parse_bool(&v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_toml() {
        let raw = r#"
            [server]
            host = "127.0.0.1"
            port = 3000

            [database]
            url = "sqlite::memory:"
            max_connections = 1

            [jwt]
            secret = "s"
            access_token_expires_in = 60
            refresh_token_expires_in = 120
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.server.port, 3000);
        assert!(!config.stripe.is_configured());
        assert_eq!(config.storage.driver, StorageDriver::Local);
        assert_eq!(config.storage.public_path, "/uploads");
    }

    #[test]
    fn test_storage_section_and_driver_parse() {
        let raw = r#"
            [server]
            host = "0.0.0.0"
            port = 8080

            [database]
            url = "postgres://localhost/press"
            max_connections = 5

            [jwt]
            secret = "s"
            access_token_expires_in = 60
            refresh_token_expires_in = 120

            [stripe]
            mock = true

            [storage]
            driver = "s3"

            [storage.s3]
            bucket = "media"
            force_path_style = true
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert!(config.stripe.is_configured());
        assert_eq!(config.storage.driver, StorageDriver::S3);
        assert_eq!(config.storage.s3.bucket, "media");
        assert!(config.storage.s3.force_path_style);
        assert_eq!("S3".parse::<StorageDriver>(), Ok(StorageDriver::S3));
        assert!("ftp".parse::<StorageDriver>().is_err());
    }

    #[test]
    fn test_parse_bool_values() {
        assert!(parse_bool("true"));
        assert!(parse_bool("1"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool("nope"));
    }
}
