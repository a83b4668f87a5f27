use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::Client;

use crate::errors::SourceError;

/// Desktop browser user agent sent with every upstream request.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub fn default_client() -> Client {
    Client::builder()
        .connect_timeout(REQUEST_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .danger_accept_invalid_certs(true)
        .build()
        .unwrap()
}

/// Client routed through `proxy` when one is configured. An unparseable proxy
/// endpoint falls back to a direct client.
pub fn client_for_proxy(proxy: Option<&str>) -> Client {
    let Some(proxy) = proxy.filter(|p| !p.is_empty()) else {
        return default_client();
    };
    match reqwest::Proxy::all(proxy) {
        Ok(proxy) => Client::builder()
            .proxy(proxy)
            .connect_timeout(REQUEST_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(true)
            .build()
            .unwrap_or_else(|_| default_client()),
        Err(err) => {
            log::warn!("Invalid proxy endpoint {proxy}: {err}");
            default_client()
        }
    }
}

/// Rewrite a backend host through a CORS relay: the real destination is
/// appended to the relay's path, so all request paths are built on top of the
/// rewritten base.
pub fn relay_base(cors_host: Option<&str>, host: &str) -> String {
    match cors_host.filter(|relay| !relay.is_empty()) {
        Some(relay) => {
            let clean = host
                .trim_start_matches("https://")
                .trim_start_matches("http://");
            format!("{relay}/https://{clean}")
        }
        None => host.to_string(),
    }
}

/// Insert a header, skipping empty or unrepresentable values.
pub fn insert_header(headers: &mut HeaderMap, name: &'static str, value: &str) {
    if value.is_empty() {
        return;
    }
    if let Ok(value) = value.parse() {
        headers.insert(name, value);
    } else {
        log::warn!("Dropping header {name} with unrepresentable value");
    }
}

pub async fn get(client: &Client, url: &str, headers: HeaderMap) -> Result<String, SourceError> {
    let response = client
        .get(url)
        .header("User-Agent", USER_AGENT)
        .headers(headers)
        .send()
        .await?;
    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        return Err(SourceError::Network(format!(
            "GET {url} returned status {status}"
        )));
    }
    Ok(text)
}

pub async fn post_form(
    client: &Client,
    url: &str,
    body: &str,
    headers: HeaderMap,
) -> Result<String, SourceError> {
    let response = client
        .post(url)
        .header("User-Agent", USER_AGENT)
        .header(
            "Content-Type",
            "application/x-www-form-urlencoded; charset=UTF-8",
        )
        .headers(headers)
        .body(body.to_string())
        .send()
        .await?;
    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        return Err(SourceError::Network(format!(
            "POST {url} returned status {status}"
        )));
    }
    Ok(text)
}
