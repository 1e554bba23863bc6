//! HTTP transport for source datasets.

use std::time::Duration;

use ureq::tls::{RootCerts, TlsConfig, TlsProvider};
use ureq::Agent;

/// Default bound on a single source request.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Largest source file we are willing to buffer (64 MB).
pub const MAX_SOURCE_SIZE: u64 = 64 * 1024 * 1024;

const USER_AGENT: &str = concat!("fontget/", env!("CARGO_PKG_VERSION"));

/// Raw outcome of a GET: status code and body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Network seam used by the source fetcher.
///
/// Implementations must honour `timeout` as an upper bound for the whole
/// request. Errors are human-readable transport failures; HTTP status codes
/// are not errors at this level.
pub trait SourceTransport: Send + Sync {
    fn get(&self, url: &str, timeout: Duration) -> Result<TransportResponse, String>;
}

/// `ureq` transport with native-tls and a global per-request timeout.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpTransport;

impl HttpTransport {
    pub fn new() -> Self {
        Self
    }
}

impl SourceTransport for HttpTransport {
    fn get(&self, url: &str, timeout: Duration) -> Result<TransportResponse, String> {
        validate_source_url(url)?;

        let response = agent(timeout)
            .get(url)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/json")
            .call()
            .map_err(|e| format!("request to '{url}' failed: {e}"))?;

        let status = response.status().as_u16();
        let body = response
            .into_body()
            .with_config()
            .limit(MAX_SOURCE_SIZE)
            .read_to_vec()
            .map_err(|e| format!("reading response from '{url}' failed: {e}"))?;

        Ok(TransportResponse { status, body })
    }
}

/// Only `http` and `https` URLs with a host are fetched.
pub fn validate_source_url(url: &str) -> Result<(), String> {
    let parsed = url::Url::parse(url).map_err(|e| format!("invalid URL '{url}': {e}"))?;
    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(format!("unsupported URL scheme '{scheme}' in '{url}'")),
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(format!("URL '{url}' has no host"));
    }
    Ok(())
}

fn agent(timeout: Duration) -> Agent {
    let tls_config = TlsConfig::builder()
        .provider(TlsProvider::NativeTls)
        .root_certs(RootCerts::PlatformVerifier)
        .build();

    Agent::config_builder()
        .tls_config(tls_config)
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}
