//! Blocking HTTP client used by the fallback probe.
//!
//! The client is built per probe and dropped right after the request, so
//! nothing is pooled between calls. It is configured with:
//! - a single overall request timeout
//! - optional use of the environment's proxy settings
//! - an optional IPv4-only restriction (the local socket is bound to
//!   `0.0.0.0`, so only A records are dialed)
//! - a user agent
//!
//! # Example
//! ```no_run
//! use netprobe_config::http::{HttpClientParams, build_probe_client, head_url};
//! use std::time::Duration;
//!
//! let client = build_probe_client(HttpClientParams {
//!     timeout: Duration::from_secs(2),
//!     ipv4_only: true,
//!     use_proxy: true,
//!     user_agent: "netprobe/0.1",
//! })
//! .unwrap();
//! let status = head_url(&client, "http://www.taobao.com/").unwrap();
//! ```
use reqwest::{blocking::Client, Method};
use std::{
    net::{IpAddr, Ipv4Addr},
    time::Duration,
};

/// Parameters for configuring the probe client.
#[derive(Debug, Clone)]
pub struct HttpClientParams<'a> {
    pub timeout: Duration,
    pub ipv4_only: bool,
    pub use_proxy: bool,
    pub user_agent: &'a str,
}

/// Builds a blocking HTTP client with the specified parameters.
///
/// Redirects are not followed: any answer from the target is enough to
/// prove the route works.
pub fn build_probe_client(
    params: HttpClientParams,
) -> Result<Client, reqwest::Error> {
    let mut client_builder = Client::builder()
        .use_rustls_tls()
        .timeout(params.timeout)
        .connect_timeout(params.timeout)
        .redirect(reqwest::redirect::Policy::none())
        .pool_max_idle_per_host(0)
        .user_agent(params.user_agent);

    if !params.use_proxy {
        client_builder = client_builder.no_proxy();
    }

    if params.ipv4_only {
        client_builder =
            client_builder.local_address(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    }

    client_builder.build()
}

/// Sends a single HEAD request and returns the status line.
///
/// The body is never read. No retries: the caller owns the time budget.
pub fn head_url(
    client: &Client,
    url: &str,
) -> Result<reqwest::StatusCode, reqwest::Error> {
    request_status(client, Method::HEAD, url)
}

/// Sends one request with `method` and returns the status line. The
/// response is dropped without reading the body.
pub fn request_status(
    client: &Client,
    method: Method,
    url: &str,
) -> Result<reqwest::StatusCode, reqwest::Error> {
    let response = client.request(method, url).send()?;
    Ok(response.status())
}
