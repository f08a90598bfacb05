//! Pinata IPFS pinning client.

use crate::error::{Error, Result};
use crate::model::ContentId;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;

use super::ContentStore;

/// Default Pinata API root.
pub const DEFAULT_API_URL: &str = "https://api.pinata.cloud";

/// Environment variable holding the Pinata JWT.
pub const JWT_ENV: &str = "PINATA_JWT";

/// Environment variable overriding the API root.
pub const API_URL_ENV: &str = "PINATA_API_URL";

#[derive(Debug, Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

/// Stores content on IPFS through Pinata's pinning API.
#[derive(Clone)]
pub struct PinataStore {
    client: reqwest::Client,
    api_url: String,
    jwt: String,
}

impl PinataStore {
    /// Create a client authenticating with a Pinata JWT.
    pub fn new(jwt: impl Into<String>) -> Result<Self> {
        let jwt = jwt.into();
        if jwt.trim().is_empty() {
            return Err(Error::InvalidConfig(format!("{} must not be empty", JWT_ENV)));
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("pdfveil/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            client,
            api_url: DEFAULT_API_URL.to_string(),
            jwt,
        })
    }

    /// Create a client from `PINATA_JWT` and, if set, `PINATA_API_URL`.
    pub fn from_env() -> Result<Self> {
        let jwt = std::env::var(JWT_ENV).map_err(|_| {
            Error::InvalidConfig(format!("{} environment variable is required", JWT_ENV))
        })?;
        let store = Self::new(jwt)?;
        Ok(match std::env::var(API_URL_ENV) {
            Ok(url) => store.with_api_url(url),
            Err(_) => store,
        })
    }

    /// Point at a different API root (e.g. a local mock).
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// The API root in use.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    async fn pin(&self, request: reqwest::RequestBuilder) -> Result<ContentId> {
        let response = request.bearer_auth(&self.jwt).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Store(format!(
                "Pinata returned HTTP {}: {}",
                status.as_u16(),
                body.trim()
            )));
        }

        let pinned: PinResponse = response.json().await?;
        Ok(ContentId::new(pinned.ipfs_hash))
    }
}

impl std::fmt::Debug for PinataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinataStore")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ContentStore for PinataStore {
    async fn put_bytes(&self, payload: &[u8], name: &str) -> Result<ContentId> {
        let part = Part::bytes(payload.to_vec()).file_name(name.to_string());
        let metadata = serde_json::json!({ "name": name });
        let form = Form::new()
            .part("file", part)
            .text("pinataMetadata", metadata.to_string());

        let url = format!("{}/pinning/pinFileToIPFS", self.api_url);
        self.pin(self.client.post(url).multipart(form)).await
    }

    async fn put_json(&self, value: &serde_json::Value, name: Option<&str>) -> Result<ContentId> {
        let mut body = serde_json::json!({ "pinataContent": value });
        if let Some(name) = name {
            body["pinataMetadata"] = serde_json::json!({ "name": name });
        }

        let url = format!("{}/pinning/pinJSONToIPFS", self.api_url);
        self.pin(self.client.post(url).json(&body)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    /// Answer one request on a local port and hand back the raw request.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            request
        });
        (url, handle)
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf);
            let Some(end) = text.find("\r\n\r\n") else {
                continue;
            };
            let head = text[..end].to_ascii_lowercase();
            let content_length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok());
            match content_length {
                Some(len) if buf.len() >= end + 4 + len => break,
                Some(_) => continue,
                None if !head.contains("transfer-encoding: chunked") => break,
                None if text.ends_with("0\r\n\r\n") => break,
                None => continue,
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn body_of(request: &str) -> &str {
        request.split_once("\r\n\r\n").map(|(_, body)| body).unwrap_or("")
    }

    #[tokio::test]
    async fn test_put_bytes_sends_multipart_file() {
        let (url, server) = serve_once("200 OK", r#"{"IpfsHash":"QmFile"}"#).await;
        let store = PinataStore::new("jwt-token").unwrap().with_api_url(url);

        let id = store.put_bytes(b"page pixels", "page-1.png").await.unwrap();
        assert_eq!(id.as_str(), "QmFile");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /pinning/pinFileToIPFS HTTP/1.1"));
        let lower = request.to_ascii_lowercase();
        assert!(lower.contains("authorization: bearer jwt-token"));
        assert!(lower.contains("content-type: multipart/form-data; boundary="));

        let body = body_of(&request);
        assert!(body.contains(r#"name="file"; filename="page-1.png""#));
        assert!(body.contains("page pixels"));
        assert!(body.contains(r#"name="pinataMetadata""#));
        assert!(body.contains(r#"{"name":"page-1.png"}"#));
    }

    #[tokio::test]
    async fn test_put_json_wraps_content_and_metadata() {
        let (url, server) = serve_once("200 OK", r#"{"IpfsHash":"QmJson"}"#).await;
        let store = PinataStore::new("jwt-token").unwrap().with_api_url(url);

        let value = serde_json::json!(["QmA", "QmB"]);
        let id = store.put_json(&value, Some("ipfs_cids.json")).await.unwrap();
        assert_eq!(id.as_str(), "QmJson");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /pinning/pinJSONToIPFS HTTP/1.1"));
        assert!(request
            .to_ascii_lowercase()
            .contains("authorization: bearer jwt-token"));

        let body: serde_json::Value = serde_json::from_str(body_of(&request)).unwrap();
        assert_eq!(body["pinataContent"], value);
        assert_eq!(body["pinataMetadata"]["name"], "ipfs_cids.json");
    }

    #[tokio::test]
    async fn test_put_json_without_name_has_no_metadata() {
        let (url, server) = serve_once("200 OK", r#"{"IpfsHash":"QmAnon"}"#).await;
        let store = PinataStore::new("jwt-token").unwrap().with_api_url(url);

        store.put_json(&serde_json::json!({"a": 1}), None).await.unwrap();

        let request = server.await.unwrap();
        let body: serde_json::Value = serde_json::from_str(body_of(&request)).unwrap();
        assert_eq!(body["pinataContent"]["a"], 1);
        assert!(body.get("pinataMetadata").is_none());
    }

    #[tokio::test]
    async fn test_http_error_becomes_store_error() {
        let (url, server) = serve_once("401 Unauthorized", r#"{"error":"bad jwt"}"#).await;
        let store = PinataStore::new("expired").unwrap().with_api_url(url);

        let err = store.put_bytes(b"x", "page-1.png").await.unwrap_err();
        server.await.unwrap();
        match err {
            Error::Store(message) => {
                assert!(message.contains("401"));
                assert!(message.contains("bad jwt"));
            }
            other => panic!("expected store error, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_empty_jwt() {
        assert!(matches!(PinataStore::new("  "), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_api_url_override() {
        let store = PinataStore::new("token")
            .unwrap()
            .with_api_url("http://localhost:8080/");
        assert_eq!(store.api_url(), "http://localhost:8080");
    }

    #[test]
    fn test_pin_response_parsing() {
        let pinned: PinResponse = serde_json::from_str(
            r#"{"IpfsHash":"QmYwAPJzv5CZsnA","PinSize":1234,"Timestamp":"2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(pinned.ipfs_hash, "QmYwAPJzv5CZsnA");
    }
}
