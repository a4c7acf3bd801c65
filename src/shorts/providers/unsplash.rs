use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;

use super::{ImageSearch, ensure_success, require_key};
use crate::shorts::config::ProvidersConfig;
use crate::ui::prelude::{Level, emit};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    urls: PhotoUrls,
}

#[derive(Debug, Deserialize)]
struct PhotoUrls {
    full: String,
}

/// Unsplash photo search, portrait orientation only.
pub struct UnsplashClient {
    client: Client,
    access_key: Option<String>,
    base_url: String,
}

impl UnsplashClient {
    pub fn new(client: Client, config: &ProvidersConfig) -> Self {
        Self {
            client,
            access_key: config.unsplash_access_key.clone(),
            base_url: config.unsplash_base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn download(&self, url: &str) -> Result<Bytes> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to download image {url}"))?;
        let resp = ensure_success(resp, "Unsplash download").await?;
        resp.bytes()
            .await
            .with_context(|| format!("Failed to read image {url}"))
    }
}

#[async_trait]
impl ImageSearch for UnsplashClient {
    async fn search(&self, keyword: &str, count: usize) -> Result<Vec<Bytes>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let access_key = require_key(&self.access_key, "Unsplash access key")?;
        let per_page = count.to_string();

        let resp = self
            .client
            .get(format!("{}/search/photos", self.base_url))
            .header(AUTHORIZATION, format!("Client-ID {access_key}"))
            .query(&[
                ("query", keyword),
                ("per_page", per_page.as_str()),
                ("orientation", "portrait"),
            ])
            .send()
            .await
            .context("Failed to connect to Unsplash search")?;
        let resp = ensure_success(resp, "Unsplash search").await?;

        let body: SearchResponse = resp
            .json()
            .await
            .context("Failed to parse Unsplash search response")?;

        emit(
            Level::Debug,
            "shorts.unsplash.search",
            &format!("'{keyword}' returned {} result(s)", body.results.len()),
            None,
        );

        let mut images = Vec::with_capacity(count);
        for photo in body.results.into_iter().take(count) {
            images.push(self.download(&photo.urls.full).await?);
        }
        Ok(images)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_response_reads_full_urls() {
        let body: SearchResponse = serde_json::from_str(
            r#"{"total":2,"results":[{"id":"a","urls":{"full":"https://img/a","small":"x"}},{"id":"b","urls":{"full":"https://img/b"}}]}"#,
        )
        .unwrap();
        let urls: Vec<_> = body.results.iter().map(|p| p.urls.full.as_str()).collect();
        assert_eq!(urls, vec!["https://img/a", "https://img/b"]);
    }

    #[tokio::test]
    async fn zero_count_makes_no_request() {
        let client = UnsplashClient::new(Client::new(), &ProvidersConfig::default());
        assert!(client.search("news", 0).await.unwrap().is_empty());
    }
}
