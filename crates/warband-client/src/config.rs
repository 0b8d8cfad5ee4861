use core::time::Duration;

/// Optimizer address used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Upper bound on `POST /optimize`, including reading the response.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on establishing a TCP connection to the optimizer.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Number of decoded frames buffered between the stream task and its
/// [`Subscription`](crate::Subscription).
pub const DEFAULT_FRAME_BUFFER: usize = 32;

/// Settings for a [`JobClient`](crate::JobClient).
///
/// The request timeout applies to job submission only. A status stream stays
/// open for as long as the job runs, so only the connect timeout bounds it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub frame_buffer: usize,
}

impl ClientConfig {
    /// Default settings against `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            frame_buffer: DEFAULT_FRAME_BUFFER,
        }
    }
}
