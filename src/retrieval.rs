//! Retrieval probe
//!
//! Checks that an uploaded blob is readable back from the storage network
//! with a `HEAD` request. A probe never fails: an unreachable or non-2xx
//! endpoint is reported as an unsuccessful check.

use std::time::{Duration, Instant};

use reqwest::header::CONTENT_LENGTH;
use serde::{Deserialize, Serialize};

/// Outcome of a test read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalCheck {
    pub success: bool,
    /// Round trip in milliseconds, 0 when the request never completed
    pub response_time_ms: u64,
    /// Stored size as reported by `content-length`
    pub size: u64,
}

impl RetrievalCheck {
    pub fn failed() -> Self {
        Self {
            success: false,
            response_time_ms: 0,
            size: 0,
        }
    }
}

pub struct RetrievalProbe {
    client: reqwest::Client,
}

impl RetrievalProbe {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    pub async fn check(&self, storage_url: &str) -> RetrievalCheck {
        let started = Instant::now();

        let response = match self.client.head(storage_url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(url = %storage_url, error = %e, "Retrieval check failed");
                return RetrievalCheck::failed();
            }
        };

        let response_time_ms = started.elapsed().as_millis() as u64;
        let size = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);

        let check = RetrievalCheck {
            success: response.status().is_success(),
            response_time_ms,
            size,
        };
        tracing::debug!(
            url = %storage_url,
            status = %response.status(),
            response_time_ms = check.response_time_ms,
            size = check.size,
            "Retrieval check complete"
        );
        check
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_endpoint_reports_failure() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let probe = RetrievalProbe::new(Duration::from_secs(2)).unwrap();
        let check = probe
            .check(&format!("http://127.0.0.1:{}/v1/blobs/0xabc/a.txt", port))
            .await;
        assert_eq!(check, RetrievalCheck::failed());
    }

    #[test]
    fn test_wire_shape() {
        let check = RetrievalCheck {
            success: true,
            response_time_ms: 42,
            size: 1024,
        };
        let json = serde_json::to_value(check).unwrap();
        assert_eq!(json["responseTimeMs"], 42);
        assert_eq!(json["size"], 1024);
    }
}
