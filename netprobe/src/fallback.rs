//! HTTP fallback probe, used when ICMP is filtered but HTTP gets through.
use crate::error::FallbackError;
use netprobe_config::http::{build_probe_client, request_status, HttpClientParams};
use reqwest::{Method, Url};
use std::time::Duration;

/// How the fallback client should be set up for one probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackRequest {
    pub timeout: Duration,
    pub ipv4_only: bool,
    /// Send HEAD so only the status line comes back. With `false` a GET is
    /// sent and the body is dropped unread.
    pub no_body: bool,
    pub use_proxy: bool,
    pub user_agent: String,
}

/// Status line of a fallback response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadResponse {
    pub status: u16,
}

impl HeadResponse {
    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status)
    }
}

pub trait HttpProbeClient {
    fn head(&self, address: &str) -> Result<HeadResponse, FallbackError>;
}

/// Creates a fresh client for every probe. A creation error is what turns a
/// failed echo into a hard failure instead of a soft one.
pub trait HttpProbeFactory: Send + Sync {
    fn create(
        &self,
        request: &FallbackRequest,
    ) -> Result<Box<dyn HttpProbeClient>, FallbackError>;
}

/// Turn a bare host into an `http://` URL; full URLs pass through.
pub fn target_url(address: &str) -> Result<Url, FallbackError> {
    let raw = if address.contains("://") {
        address.to_string()
    } else if address.parse::<std::net::Ipv6Addr>().is_ok() {
        format!("http://[{address}]/")
    } else {
        format!("http://{address}/")
    };

    Url::parse(&raw).map_err(|e| FallbackError::InvalidUrl {
        url: raw,
        reason: e.to_string(),
    })
}

/// Fallback backed by a blocking `reqwest` client.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReqwestFactory;

struct ReqwestProbe {
    client: reqwest::blocking::Client,
    method: Method,
}

impl HttpProbeFactory for ReqwestFactory {
    fn create(
        &self,
        request: &FallbackRequest,
    ) -> Result<Box<dyn HttpProbeClient>, FallbackError> {
        let client = build_probe_client(HttpClientParams {
            timeout: request.timeout,
            ipv4_only: request.ipv4_only,
            use_proxy: request.use_proxy,
            user_agent: &request.user_agent,
        })
        .map_err(|e| FallbackError::Init(e.to_string()))?;

        let method = if request.no_body {
            Method::HEAD
        } else {
            Method::GET
        };
        Ok(Box::new(ReqwestProbe { client, method }))
    }
}

impl HttpProbeClient for ReqwestProbe {
    fn head(&self, address: &str) -> Result<HeadResponse, FallbackError> {
        let url = target_url(address)?;
        let status =
            request_status(&self.client, self.method.clone(), url.as_str())?;
        Ok(HeadResponse {
            status: status.as_u16(),
        })
    }
}
