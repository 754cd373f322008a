#[cfg(feature = "metrics")]
mod registry {
    use lazy_static::lazy_static;
    use prometheus::{Encoder, IntCounter, TextEncoder};

    /// Creates a counter and registers it with the default registry.
    ///
    /// A name already taken in the registry leaves the counter working but
    /// unexported instead of panicking.
    pub(crate) fn counter(name: &str, help: &str) -> IntCounter {
        let counter = IntCounter::new(name, help).expect("metric name is a valid identifier");
        if let Err(e) = prometheus::register(Box::new(counter.clone())) {
            tracing::warn!("Metric {} not registered: {}", name, e);
        }
        counter
    }

    lazy_static! {
        pub(super) static ref REQUESTS_SENT: IntCounter = counter(
            "parse_requests_sent_total",
            "Total number of requests written to the backend"
        );
        pub(super) static ref CONNECT_FAILURES: IntCounter = counter(
            "parse_connect_failures_total",
            "Total number of failed connection attempts"
        );
        pub(super) static ref BYTES_RECEIVED: IntCounter = counter(
            "parse_response_bytes_received_total",
            "Total number of response bytes stored in reader buffers"
        );
        pub(super) static ref BYTES_DISCARDED: IntCounter = counter(
            "parse_response_bytes_discarded_total",
            "Total number of response bytes dropped because the buffer was full"
        );
        pub(super) static ref PUSH_KEEPALIVES: IntCounter = counter(
            "parse_push_keepalives_total",
            "Total number of keepalives sent on the push connection"
        );
    }

    pub fn gather_metrics() -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        let metric_families = prometheus::gather();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::warn!("Failed to encode metrics: {}", e);
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

#[cfg(feature = "metrics")]
pub use registry::gather_metrics;
#[cfg(feature = "metrics")]
pub(crate) use registry::counter;

macro_rules! recorder {
    ($name:ident, $counter:ident) => {
        #[allow(unused_variables)]
        pub(crate) fn $name(n: usize) {
            #[cfg(feature = "metrics")]
            registry::$counter.inc_by(n as u64);
        }
    };
}

recorder!(record_request, REQUESTS_SENT);
recorder!(record_connect_failure, CONNECT_FAILURES);
recorder!(record_bytes_received, BYTES_RECEIVED);
recorder!(record_bytes_discarded, BYTES_DISCARDED);
recorder!(record_keepalive, PUSH_KEEPALIVES);
