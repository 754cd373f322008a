use std::time::Duration;

use tokio_stream::Stream;
use tracing::{debug, instrument, warn};

use crate::{metrics, Connection, ResponseReader, DEFAULT_BUFFER_SIZE, DEFAULT_SCRATCH_SIZE};

const KEEPALIVE: &[u8] = b"{}\r\n";
const PUSH_PROTOCOL_VERSION: &str = "e1.0.0";

/// Handshake sent right after the push connection opens.
pub fn push_handshake(installation_id: &str, application_id: &str) -> String {
    format!(
        "{{\"installation_id\":\"{}\",\"oauth_key\":\"{}\",\"v\":\"{}\",\"last\":null}}",
        installation_id, application_id, PUSH_PROTOCOL_VERSION
    )
}

/// Long-lived server-push connection.
///
/// There is no reconnect logic: once the connection drops it stays down until
/// [`start`](PushChannel::start) is called again.
pub struct PushChannel<C> {
    connection: C,
    host: String,
    port: u16,
    buffer_size: usize,
    scratch_size: usize,
}

impl<C: Connection> PushChannel<C> {
    pub fn new(connection: C, host: impl Into<String>, port: u16) -> Self {
        Self {
            connection,
            host: host.into(),
            port,
            buffer_size: DEFAULT_BUFFER_SIZE,
            scratch_size: DEFAULT_SCRATCH_SIZE,
        }
    }

    /// Capacities used by readers returned from [`next`](Self::next).
    pub fn with_buffer_sizes(mut self, buffer_size: usize, scratch_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self.scratch_size = scratch_size;
        self
    }

    /// (Re)opens the connection and sends `handshake`.
    #[instrument(skip(self, handshake), fields(host = %self.host))]
    pub async fn start(&mut self, handshake: &str) -> bool {
        self.connection.close().await;
        if !self.connection.connect(&self.host, self.port).await {
            warn!("Failed to connect to push server");
            metrics::record_connect_failure(1);
            return false;
        }
        debug!("Push connection established");

        let mut line = Vec::with_capacity(handshake.len() + 2);
        line.extend_from_slice(handshake.as_bytes());
        line.extend_from_slice(b"\r\n");
        if let Err(e) = self.connection.send(&line).await {
            warn!("Failed to send push handshake: {}", e);
            return false;
        }
        true
    }

    /// `true` when push data is waiting. Otherwise sends a keepalive if the
    /// connection is still up.
    pub async fn available(&mut self) -> bool {
        if self.connection.available() > 0 {
            return true;
        }
        if self.connection.connected() {
            match self.connection.send(KEEPALIVE).await {
                Ok(()) => metrics::record_keepalive(1),
                Err(e) => warn!("Failed to send push keepalive: {}", e),
            }
        }
        false
    }

    /// Reader over the pending push data.
    pub fn next(&mut self) -> ResponseReader<'_> {
        ResponseReader::with_capacity(&mut self.connection, self.buffer_size, self.scratch_size)
    }

    pub async fn stop(&mut self) {
        self.connection.close().await;
    }

    pub fn is_connected(&self) -> bool {
        self.connection.connected()
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    /// Pushes as a stream of message texts.
    ///
    /// Polls every `poll_interval`, sending keepalives in between, and ends
    /// once the connection is lost and no data is left.
    pub fn notifications(&mut self, poll_interval: Duration) -> impl Stream<Item = String> + '_ {
        async_stream::stream! {
            loop {
                if self.available().await {
                    let mut push = self.next();
                    let message = push.json_body().to_string();
                    push.close();
                    yield message;
                } else if !self.connection.connected() {
                    debug!("Push connection lost, ending notification stream");
                    break;
                } else {
                    tokio::time::sleep(poll_interval).await;
                }
            }
        }
    }
}
