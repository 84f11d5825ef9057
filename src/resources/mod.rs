//! Fetching remote resources.
//!
//! Everything the loader needs from the network goes through [`SkinFetcher`],
//! so tests and embedders can serve textures from memory instead.

use std::future::Future;

use base64::Engine;

/// Source of raw texture bytes and lookup responses.
pub trait SkinFetcher {
    fn fetch_bytes(&self, url: &str) -> impl Future<Output = anyhow::Result<Vec<u8>>>;
    fn fetch_text(&self, url: &str) -> impl Future<Output = anyhow::Result<String>>;
}

/// Fetches over HTTP(S) with `reqwest`, the browser's fetch on the web.
#[derive(Clone, Debug, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SkinFetcher for HttpFetcher {
    fn fetch_bytes(&self, url: &str) -> impl Future<Output = anyhow::Result<Vec<u8>>> {
        let request = self.client.get(url);
        async move {
            let response = request.send().await?.error_for_status()?;
            Ok(response.bytes().await?.to_vec())
        }
    }

    fn fetch_text(&self, url: &str) -> impl Future<Output = anyhow::Result<String>> {
        let request = self.client.get(url);
        async move {
            let response = request.send().await?.error_for_status()?;
            Ok(response.text().await?)
        }
    }
}

/// Decodes inline image data.
///
/// Accepts `data:<mime>;base64,<payload>` urls as well as a bare base64 payload.
pub fn decode_inline(data: &str) -> anyhow::Result<Vec<u8>> {
    let payload = match data.strip_prefix("data:") {
        Some(url) => {
            let (header, payload) = url
                .split_once(',')
                .ok_or_else(|| anyhow::anyhow!("Malformed data url"))?;
            if !header.ends_with(";base64") {
                anyhow::bail!("Only base64 encoded data urls are supported");
            }
            payload
        }
        None => data,
    };
    Ok(base64::engine::general_purpose::STANDARD.decode(payload.trim())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_data_urls_and_bare_payloads() {
        assert_eq!(decode_inline("data:image/png;base64,AQID").unwrap(), vec![1, 2, 3]);
        assert_eq!(decode_inline("AQID").unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn rejects_non_base64_data_urls() {
        assert!(decode_inline("data:text/plain,hello").is_err());
        assert!(decode_inline("data:image/png;base64").is_err());
    }
}
