use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;

use super::{ArticleFetcher, ensure_success};

/// Plain HTTP GET of an article page.
pub struct HttpArticleFetcher {
    client: Client,
}

impl HttpArticleFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ArticleFetcher for HttpArticleFetcher {
    async fn fetch_html(&self, url: &str) -> Result<String> {
        let parsed = reqwest::Url::parse(url).with_context(|| format!("Invalid article URL '{url}'"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            anyhow::bail!("Unsupported URL scheme '{}'", parsed.scheme());
        }

        let resp = self
            .client
            .get(parsed)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {url}"))?;
        let resp = ensure_success(resp, "Article").await?;
        resp.text()
            .await
            .with_context(|| format!("Failed to read body of {url}"))
    }
}
