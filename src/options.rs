use crate::RetryPolicy;

/// Configures HTTP timeout, server selection and retry behavior.
#[derive(Clone, Debug, PartialEq)]
pub struct ClientOptions {
    /// Per-attempt timeout in milliseconds.
    pub timeout_ms: u64,
    /// Overrides the server derived from the auth key.
    pub server_url: Option<String>,
    /// Attempt budget and backoff used by every dispatched request.
    pub retry: RetryPolicy,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            server_url: None,
            retry: RetryPolicy::default(),
        }
    }
}
