//! Bus Vision approach page fetcher

use crate::{
    config::TrackerConfig, constants::USER_AGENT, error::FetchError,
    fetcher::ApproachFetcher,
};
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::Duration;

/// Fetches the approach page over HTTP
pub struct BusVisionFetcher {
    client: Client,
    endpoint: String,
}

impl BusVisionFetcher {
    /// Creates a new fetcher for the given endpoint
    ///
    /// The endpoint is parsed on every fetch, so a malformed URL shows up as
    /// a failed poll rather than a construction error.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(FetchError::NetworkError)?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Creates a fetcher from tracker configuration
    pub fn from_config(config: &TrackerConfig) -> Result<Self, FetchError> {
        Self::new(config.endpoint.clone(), config.request_timeout)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn parse_endpoint(&self) -> Result<Url, FetchError> {
        Url::parse(&self.endpoint)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", self.endpoint, e)))
    }
}

impl Default for BusVisionFetcher {
    fn default() -> Self {
        Self::from_config(&TrackerConfig::default())
            .expect("Failed to create Bus Vision fetcher")
    }
}

#[async_trait]
impl ApproachFetcher for BusVisionFetcher {
    async fn fetch_page(&self) -> Result<String, FetchError> {
        let url = self.parse_endpoint()?;
        tracing::debug!(url = %url, "Fetching approach page");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(FetchError::from_reqwest)?;
        let body = String::from_utf8(bytes.to_vec())
            .map_err(|e| FetchError::Decode(e.to_string()))?;

        tracing::debug!(bytes = body.len(), "Fetched approach page");

        Ok(body)
    }

    fn fetcher_name(&self) -> &'static str {
        "bus_vision"
    }
}

#[cfg(test)]
pub(crate) mod stub {
    //! Loopback HTTP stub serving canned responses

    use std::net::SocketAddr;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// How the stub answers every connection
    #[derive(Clone)]
    pub enum StubReply {
        Ok(Vec<u8>),
        Status(u16),
        Hang(Duration),
    }

    async fn read_request(stream: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
            }
        }
    }

    /// Starts the stub and returns its approach page URL
    pub async fn serve(reply: StubReply) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                let reply = reply.clone();
                tokio::spawn(async move {
                    read_request(&mut stream).await;
                    let (status, body) = match reply {
                        StubReply::Ok(body) => (200, body),
                        StubReply::Status(status) => (status, Vec::new()),
                        StubReply::Hang(duration) => {
                            tokio::time::sleep(duration).await;
                            return;
                        }
                    };
                    let head = format!(
                        "HTTP/1.1 {} Stub\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        status,
                        body.len()
                    );
                    let _ = stream.write_all(head.as_bytes()).await;
                    let _ = stream.write_all(&body).await;
                    let _ = stream.shutdown().await;
                });
            }
        });

        format!(
            "http://{}/ibako/view/approach.html?stopCdFrom=69&stopCdTo=76",
            addr
        )
    }
}

#[cfg(test)]
mod tests {
    use super::stub::{serve, StubReply};
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_fetches_body() {
        let url = serve(StubReply::Ok("<span id=\"updateTime\">12:30</span>".into())).await;
        let fetcher = BusVisionFetcher::new(url, Duration::from_secs(5)).unwrap();

        let body = fetcher.fetch_page().await.unwrap();
        assert_eq!(body, "<span id=\"updateTime\">12:30</span>");
        assert_eq!(fetcher.fetcher_name(), "bus_vision");
    }

    #[tokio::test]
    async fn test_malformed_url() {
        let fetcher = BusVisionFetcher::new("not a url", Duration::from_secs(1)).unwrap();

        let err = fetcher.fetch_page().await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let url = serve(StubReply::Status(503)).await;
        let fetcher = BusVisionFetcher::new(url, Duration::from_secs(5)).unwrap();

        let err = fetcher.fetch_page().await.unwrap_err();
        assert!(matches!(err, FetchError::HttpStatus { status: 503 }));
    }

    #[tokio::test]
    async fn test_undecodable_body() {
        let url = serve(StubReply::Ok(vec![0xff, 0xfe, 0xfd])).await;
        let fetcher = BusVisionFetcher::new(url, Duration::from_secs(5)).unwrap();

        let err = fetcher.fetch_page().await.unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[tokio::test]
    async fn test_stalled_request_times_out() {
        let url = serve(StubReply::Hang(Duration::from_secs(10))).await;
        let timeout = Duration::from_millis(300);
        let fetcher = BusVisionFetcher::new(url, timeout).unwrap();

        let start = Instant::now();
        let err = fetcher.fetch_page().await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        // Bind then drop to get a port nobody listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher =
            BusVisionFetcher::new(format!("http://{}/", addr), Duration::from_secs(5)).unwrap();
        let err = fetcher.fetch_page().await.unwrap_err();
        assert!(matches!(err, FetchError::NetworkError(_)));
    }
}
