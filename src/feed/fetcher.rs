use std::time::Duration;

use async_trait::async_trait;
use feed_rs::parser;
use reqwest::Client;

use crate::config::Config;
use crate::error::{AppError, Result};

use super::source::{FeedPayload, FeedSource, RawItem};

/// Fetches RSS/Atom documents directly and parses them locally.
pub struct FeedFetcher {
    client: Client,
}

impl FeedFetcher {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self { client })
    }

    /// Map a parsed RSS/Atom document onto the upstream payload shape.
    pub fn payload_from_bytes(bytes: &[u8]) -> Result<FeedPayload> {
        let feed = parser::parse(bytes)?;

        let items = feed
            .entries
            .into_iter()
            .map(|entry| {
                let description = entry.summary.map(|s| s.content);
                let content = entry.content.and_then(|c| c.body);

                RawItem {
                    title: entry.title.map(|t| t.content),
                    description,
                    content,
                    link: entry.links.first().map(|l| l.href.clone()),
                    pub_date: entry.published.or(entry.updated).map(|dt| dt.to_rfc3339()),
                    author: entry.authors.first().map(|a| a.name.clone()),
                }
            })
            .collect();

        Ok(FeedPayload::ok(feed.title.map(|t| t.content), items))
    }
}

#[async_trait]
impl FeedSource for FeedFetcher {
    async fn fetch(&self, url: &str) -> Result<FeedPayload> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(AppError::Fetch(format!("HTTP {} for {}", response.status(), url)));
        }

        let bytes = response.bytes().await?;
        let payload = Self::payload_from_bytes(&bytes[..])?;
        tracing::debug!("Parsed {} items from {}", payload.items.len(), url);
        Ok(payload)
    }
}
