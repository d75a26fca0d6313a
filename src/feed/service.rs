use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::config::Config;
use crate::error::{AppError, Result};

use super::source::{FeedPayload, FeedSource};

/// Asks a feed-to-JSON service (rss2json style) to fetch and flatten a feed.
pub struct ServiceFetcher {
    client: Client,
    endpoint: Url,
}

impl ServiceFetcher {
    pub fn new(config: &Config, endpoint: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            endpoint: Url::parse(endpoint)?,
        })
    }

    pub fn request_url(&self, feed_url: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("rss_url", feed_url);
        url
    }
}

#[async_trait]
impl FeedSource for ServiceFetcher {
    async fn fetch(&self, url: &str) -> Result<FeedPayload> {
        let response = self.client.get(self.request_url(url)).send().await?;

        if !response.status().is_success() {
            return Err(AppError::Fetch(format!(
                "feed service returned HTTP {} for {}",
                response.status(),
                url
            )));
        }

        let payload: FeedPayload = response.json().await?;
        tracing::debug!("Feed service returned {} items for {}", payload.items.len(), url);
        Ok(payload)
    }
}
