use std::fmt;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use crate::{
    classify::{classify_status, status_error},
    endpoint::{Body, Endpoint},
    retry::retry,
    Cancellation, ClientOptions, DeeplError, ErrorKind, Result,
};

/// Server for paid-tier auth keys.
pub const SERVER_URL_PRO: &str = "https://api.deepl.com";
/// Server for free-tier auth keys (suffix `:fx`).
pub const SERVER_URL_FREE: &str = "https://api-free.deepl.com";

const AUTH_SCHEME: &str = "DeepL-Auth-Key";
const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Selects the server for an auth key by its tier suffix.
pub fn server_url_for_key(auth_key: &str) -> &'static str {
    if auth_key.trim().ends_with(":fx") {
        SERVER_URL_FREE
    } else {
        SERVER_URL_PRO
    }
}

#[derive(Clone)]
/// HTTP client for the DeepL REST API.
///
/// Every call goes through [`Translator::dispatch`], which authenticates the
/// request and retries transient failures with exponential backoff.
pub struct Translator {
    http: reqwest::Client,
    server_url: String,
    authorization: HeaderValue,
    options: ClientOptions,
    cancellation: Cancellation,
}

impl fmt::Debug for Translator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Translator")
            .field("server_url", &self.server_url)
            .field("auth_key", &"<redacted>")
            .field("options", &self.options)
            .finish()
    }
}

impl Translator {
    /// Creates a client for `auth_key`.
    ///
    /// Keys ending in `:fx` talk to [`SERVER_URL_FREE`], all others to
    /// [`SERVER_URL_PRO`].
    pub fn new(auth_key: impl AsRef<str>) -> Result<Self> {
        let auth_key = auth_key.as_ref().trim();
        if auth_key.is_empty() {
            return Err(DeeplError::Config("auth key must not be empty".to_owned()));
        }
        let mut authorization = HeaderValue::from_str(&format!("{AUTH_SCHEME} {auth_key}"))
            .map_err(|_| {
                DeeplError::Config("auth key contains invalid header characters".to_owned())
            })?;
        authorization.set_sensitive(true);

        Ok(Self {
            http: reqwest::Client::new(),
            server_url: server_url_for_key(auth_key).to_owned(),
            authorization,
            options: ClientOptions::default(),
            cancellation: Cancellation::never(),
        })
    }

    /// Creates a client from environment variables.
    ///
    /// Reads:
    /// - `DEEPL_AUTH_KEY`: account auth key (required)
    /// - `DEEPL_SERVER_URL`: server override (optional)
    pub fn from_env() -> Result<Self> {
        let auth_key = std::env::var("DEEPL_AUTH_KEY").map_err(|_| {
            DeeplError::Config("missing DEEPL_AUTH_KEY environment variable".to_owned())
        })?;
        if auth_key.trim().is_empty() {
            return Err(DeeplError::Config(
                "DEEPL_AUTH_KEY is set but empty".to_owned(),
            ));
        }
        let server_url = std::env::var("DEEPL_SERVER_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        Ok(Self::new(auth_key)?.with_options(ClientOptions {
            server_url,
            ..ClientOptions::default()
        }))
    }

    /// Applies client options such as timeout, server override and retry policy.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        if let Some(url) = &opts.server_url {
            self.server_url = url.trim_end_matches('/').to_owned();
        }
        self.options = opts;
        self
    }

    /// Replaces the underlying HTTP client.
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Signal that aborts retry waits of every call made through this client.
    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Sends `endpoint`, retrying transient failures.
    ///
    /// Returns the first 2xx response undecoded. Fatal statuses and transport
    /// errors are never retried; rate limiting, 5xx and network failures are
    /// retried per [`ClientOptions::retry`]. Streaming bodies are regenerated
    /// for each attempt, and a body production failure takes precedence over
    /// whatever the exchange itself reported.
    pub async fn dispatch(&self, endpoint: &Endpoint) -> Result<reqwest::Response> {
        let url = format!(
            "{}/{}",
            self.server_url.trim_end_matches('/'),
            endpoint.path().trim_start_matches('/')
        );
        let headers = self.request_headers(endpoint);

        retry(
            &self.options.retry,
            &self.cancellation,
            |err: &DeeplError| err.kind() == ErrorKind::Transient,
            |attempt| self.attempt(endpoint, &url, &headers, attempt),
        )
        .await
        .map_err(DeeplError::from)
    }

    async fn attempt(
        &self,
        endpoint: &Endpoint,
        url: &str,
        headers: &HeaderMap,
        attempt: u32,
    ) -> Result<reqwest::Response> {
        #[cfg(feature = "tracing")]
        tracing::debug!(method = %endpoint.method(), %url, attempt, "sending request");
        #[cfg(not(feature = "tracing"))]
        let _ = attempt;

        let request = self
            .http
            .request(endpoint.method().clone(), url)
            .headers(headers.clone())
            .timeout(Duration::from_millis(self.options.timeout_ms));

        let (request, production) = match endpoint.body() {
            Body::Empty => (request, None),
            Body::Bytes(bytes) => (request.body(bytes.clone()), None),
            Body::Stream(producer) => {
                let (body, production) = producer.produce().into_parts();
                (request.body(body), Some(production))
            }
        };

        let sent = request.send().await;

        // The producer's verdict comes first: a failed body makes any response
        // or connection error a consequence, not the cause. A producer still
        // writing after an early response is stopped, not awaited.
        if let Some(production) = production {
            production.finish().await?;
        }

        let response = sent.map_err(DeeplError::Transport)?;
        let status = response.status();
        match classify_status(status) {
            None => Ok(response),
            Some(_) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(status = status.as_u16(), attempt, "request failed");
                Err(status_error(status))
            }
        }
    }

    fn request_headers(&self, endpoint: &Endpoint) -> HeaderMap {
        let mut headers = endpoint.headers().clone();
        headers.insert(AUTHORIZATION, self.authorization.clone());
        headers
            .entry(CONTENT_TYPE)
            .or_insert_with(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
        headers
    }
}
