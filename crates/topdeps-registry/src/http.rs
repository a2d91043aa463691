//! HTTP client shared by the listing, metadata and tarball stages
//!
//! Maps response statuses onto [`RegistryError`] so that every non-success
//! surfaces as an error the retry layer can act on.

use crate::config::HttpSettings;
use crate::error::{RegistryError, Result};

/// Thin wrapper around a pooled `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpClient {
    /// Create a new client
    pub fn new(settings: &HttpSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| RegistryError::NetworkError {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            timeout_secs: settings.timeout.as_secs(),
        })
    }

    /// Send a GET request and check the response status
    pub async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                RegistryError::Timeout {
                    seconds: self.timeout_secs,
                }
            } else {
                RegistryError::from(e)
            }
        })?;
        let status = response.status();

        // Handle rate limiting
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(60);

            return Err(RegistryError::RateLimited { retry_after });
        }

        if !status.is_success() {
            return Err(RegistryError::HttpError {
                status: status.as_u16(),
                message: format!("Request to {} failed", url),
            });
        }

        Ok(response)
    }

    /// Fetch bytes from URL
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.get(url).await?;
        let bytes = response.bytes().await.map_err(|e| RegistryError::NetworkError {
            message: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }

    /// Fetch text from URL
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.get(url).await?;
        let text = response.text().await.map_err(|e| RegistryError::NetworkError {
            message: e.to_string(),
        })?;
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> HttpClient {
        HttpClient::new(&HttpSettings::default()).unwrap()
    }

    #[tokio::test]
    async fn test_get_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/hello"))
            .respond_with(ResponseTemplate::new(200).set_body_string("world"))
            .mount(&server)
            .await;

        let text = client()
            .get_text(&format!("{}/hello", server.uri()))
            .await
            .unwrap();
        assert_eq!(text, "world");
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
            .mount(&server)
            .await;

        let err = client().get(&server.uri()).await.unwrap_err();
        assert!(matches!(err, RegistryError::RateLimited { retry_after: 7 }));
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client().get_bytes(&server.uri()).await.unwrap_err();
        assert!(matches!(err, RegistryError::HttpError { status: 404, .. }));
    }
}
