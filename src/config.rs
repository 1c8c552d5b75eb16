use ::config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_server_addr")]
    pub server_addr: String,
    /// Root directory for the JSON collections.
    #[serde(default = "default_storage_dir")]
    pub storage_dir: String,
    /// Directory for uploaded binaries, served under /uploads.
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: String,
    /// Set the Secure attribute on the session cookie.
    #[serde(default)]
    pub secure_cookies: bool,
    /// Seed the well-known admin account when users.json is empty.
    #[serde(default = "default_bootstrap_admin")]
    pub bootstrap_admin: bool,
}

fn default_server_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_storage_dir() -> String {
    "storage".to_string()
}

fn default_uploads_dir() -> String {
    "public/uploads".to_string()
}

fn default_bootstrap_admin() -> bool {
    true
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name("config").required(false))
            .add_source(Environment::with_prefix("HUBFORCE"))
            .build()?;

        s.try_deserialize()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_addr: default_server_addr(),
            storage_dir: default_storage_dir(),
            uploads_dir: default_uploads_dir(),
            secure_cookies: false,
            bootstrap_admin: default_bootstrap_admin(),
        }
    }
}
