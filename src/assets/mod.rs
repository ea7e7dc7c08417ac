//! Byte resolution for signature images and fonts.
//!
//! Pure adapter between a stored reference (data URI or URL) and raw
//! bytes. Failures of any kind resolve to `None` so rendering can fall
//! back; nothing here raises and nothing is cached across calls.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;

/// Resolves signature/font references to raw bytes.
#[derive(Clone)]
pub struct AssetLoader {
    http: reqwest::Client,
}

impl AssetLoader {
    /// Creates a loader with its own HTTP client.
    pub fn new() -> Self {
        AssetLoader {
            http: reqwest::Client::new(),
        }
    }

    /// Resolves a reference to bytes.
    ///
    /// Supported forms: `data:` URIs with a base64 payload, and `http(s)`
    /// URLs. Anything else, and any decode or fetch failure, is `None`.
    pub async fn load(&self, reference: &str) -> Option<Bytes> {
        if reference.starts_with("data:") {
            return decode_data_uri(reference);
        }
        if reference.starts_with("http") {
            return self.fetch(reference).await;
        }
        None
    }

    /// Fetches a URL, resolving non-2xx and transport errors to `None`.
    pub async fn fetch(&self, url: &str) -> Option<Bytes> {
        let response = match self.http.get(url).send().await {
            Ok(response) => response,
            Err(err) => {
                tracing::debug!(url, error = %err, "asset fetch failed");
                return None;
            }
        };
        if !response.status().is_success() {
            tracing::debug!(url, status = %response.status(), "asset fetch returned non-success");
            return None;
        }
        response.bytes().await.ok()
    }
}

impl Default for AssetLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_data_uri(source: &str) -> Option<Bytes> {
    let (_, payload) = source.split_once(',')?;
    BASE64.decode(payload).ok().map(Bytes::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn data_uri_decodes() {
        let loader = AssetLoader::new();
        let reference = format!("data:image/png;base64,{}", BASE64.encode(b"png-bytes"));
        let bytes = loader.load(&reference).await.unwrap();
        assert_eq!(&bytes[..], b"png-bytes");
    }

    #[tokio::test]
    async fn malformed_data_uri_is_none() {
        let loader = AssetLoader::new();
        assert!(loader.load("data:image/png;base64").await.is_none());
        assert!(loader.load("data:image/png;base64,@@@").await.is_none());
    }

    #[tokio::test]
    async fn http_fetch_returns_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sig.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"image".to_vec()))
            .mount(&server)
            .await;

        let loader = AssetLoader::new();
        let bytes = loader.load(&format!("{}/sig.png", server.uri())).await.unwrap();
        assert_eq!(&bytes[..], b"image");
    }

    #[tokio::test]
    async fn non_success_status_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let loader = AssetLoader::new();
        assert!(loader.load(&format!("{}/missing.png", server.uri())).await.is_none());
    }

    #[tokio::test]
    async fn unsupported_scheme_is_none() {
        let loader = AssetLoader::new();
        assert!(loader.load("file:///etc/passwd").await.is_none());
        assert!(loader.load("").await.is_none());
    }
}
