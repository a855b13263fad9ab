// src/utils/http.rs

//! HTTP client utilities.

use url::Url;

use crate::error::Result;
use crate::models::ScraperConfig;

/// Create a configured asynchronous HTTP client.
pub fn create_client(config: &ScraperConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(config.timeout())
        .build()?;
    Ok(client)
}

/// Build a rendering-service endpoint url, appending the token if any.
pub fn service_endpoint(base: &str, path: &str, token: Option<&str>) -> Result<Url> {
    let mut endpoint = Url::parse(&format!("{}/{}", base.trim_end_matches('/'), path))?;
    if let Some(token) = token {
        endpoint.query_pairs_mut().append_pair("token", token);
    }
    Ok(endpoint)
}
