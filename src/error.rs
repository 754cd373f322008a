/// Errors surfaced outside the response data path.
///
/// Reading and decoding responses never fails: a broken transport shows up
/// as an empty body and absent fields decode to zero values. These variants
/// cover transport writes and configuration.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Connection is not open")]
    NotConnected,
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[cfg(feature = "configs")]
    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] config::ConfigError),
}
