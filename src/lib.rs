//! # Parse Lite
//!
//! A small HTTP/JSON client for memory-constrained devices talking to a
//! Parse-style backend. Requests are written by hand over a [`Connection`],
//! responses land in one fixed-size buffer, and scalar fields are pulled out
//! of the raw JSON text without building a document.
//!
//! Failure is quiet by design: an unreachable backend yields an empty body,
//! overflowing responses are truncated, and missing fields decode to `0`,
//! `0.0`, `false` or `""`.
//!
//! ## Example
//!
//! ```no_run
//! use parse_lite::{Client, ClientConfig, TcpConnection};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::new("my-app-id", "my-client-key");
//!     let mut client = Client::new(config, TcpConnection::new(), TcpConnection::new())?;
//!
//!     let mut response = client
//!         .send_request("GET", "/1/classes/Temperature/abc123", "", "")
//!         .await;
//!     response.read_with_timeout(10).await;
//!     let value = response.get_double("value");
//!     let unit = response.get_string("unit").to_string();
//!     response.close();
//!
//!     println!("{} {}", value, unit);
//!     Ok(())
//! }
//! ```

#[cfg(test)]
mod tests;

mod error;
pub use error::*;

mod extract_json;
pub use extract_json::*;

mod connection;
pub use connection::*;

mod response;
pub use response::*;

mod identity;
pub use identity::*;

mod request;
pub use request::*;

mod push;
pub use push::*;

mod settings;
pub use settings::*;

mod client;
pub use client::*;

mod metrics;
pub use metrics::*;
