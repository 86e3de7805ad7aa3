//! Shared HTTP plumbing for the upstream sources

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

use onion_reader_domain::SourceError;

pub(crate) fn build_client(timeout: Duration) -> Result<Client, SourceError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("onion-reader/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| SourceError::Network(format!("Failed to build HTTP client: {}", e)))
}

/// GET a page and return its body as text
pub(crate) async fn get_text(client: &Client, url: &str) -> Result<String, SourceError> {
    let response = send(client.get(url), url).await?;
    response
        .text()
        .await
        .map_err(|e| SourceError::Decode(e.to_string()))
}

/// Send a prepared request and decode its JSON body
pub(crate) async fn get_json<T: DeserializeOwned>(
    request: RequestBuilder,
    url: &str,
) -> Result<T, SourceError> {
    let response = send(request, url).await?;
    response
        .json()
        .await
        .map_err(|e| SourceError::Decode(e.to_string()))
}

async fn send(request: RequestBuilder, url: &str) -> Result<Response, SourceError> {
    let response = request
        .send()
        .await
        .map_err(|e| SourceError::Network(e.to_string()))?;

    if !response.status().is_success() {
        return Err(SourceError::Http {
            status: response.status().as_u16(),
            url: url.to_string(),
        });
    }

    Ok(response)
}
