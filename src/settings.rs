use serde::{Deserialize, Serialize};

use crate::{ClientError, DEFAULT_BUFFER_SIZE, DEFAULT_SCRATCH_SIZE};

pub const DEFAULT_API_HOST: &str = "api.parse.com";
pub const DEFAULT_PUSH_HOST: &str = "push.parse.com";
pub const DEFAULT_PORT: u16 = 443;
pub const DEFAULT_USER_AGENT: &str = concat!("parse-lite/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_CLIENT_VERSION: &str = "1.0";

/// Settings for a [`crate::Client`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api_host: String,
    pub push_host: String,
    pub port: u16,
    pub user_agent: String,
    pub client_version: String,
    pub application_id: String,
    pub client_key: String,
    /// Reuse a previously registered installation instead of creating one.
    pub installation_id: Option<String>,
    /// Capacity of each response buffer, terminator included.
    pub buffer_size: usize,
    /// Capacity of the string scratch buffer, terminator included.
    pub scratch_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_host: DEFAULT_API_HOST.to_string(),
            push_host: DEFAULT_PUSH_HOST.to_string(),
            port: DEFAULT_PORT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            client_version: DEFAULT_CLIENT_VERSION.to_string(),
            application_id: String::new(),
            client_key: String::new(),
            installation_id: None,
            buffer_size: DEFAULT_BUFFER_SIZE,
            scratch_size: DEFAULT_SCRATCH_SIZE,
        }
    }
}

impl ClientConfig {
    pub fn new(application_id: impl Into<String>, client_key: impl Into<String>) -> Self {
        Self {
            application_id: application_id.into(),
            client_key: client_key.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        if self.application_id.is_empty() {
            return Err(ClientError::Config("application_id must not be empty".into()));
        }
        if self.api_host.is_empty() || self.push_host.is_empty() {
            return Err(ClientError::Config("hosts must not be empty".into()));
        }
        if self.buffer_size < 2 {
            return Err(ClientError::Config(format!(
                "buffer_size must be at least 2, got {}",
                self.buffer_size
            )));
        }
        if self.scratch_size < 2 {
            return Err(ClientError::Config(format!(
                "scratch_size must be at least 2, got {}",
                self.scratch_size
            )));
        }
        Ok(())
    }
}

#[cfg(feature = "configs")]
pub mod configuration {
    use config::{Config, Environment, File};

    use super::ClientConfig;
    use crate::ClientError;

    /// Loads settings from `path`, overridden by `PARSE_*` environment
    /// variables (`PARSE_APPLICATION_ID`, `PARSE_BUFFER_SIZE`, ...).
    pub fn load_config(path: &str) -> Result<ClientConfig, ClientError> {
        let settings = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("PARSE"))
            .build()?;

        let config: ClientConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}
