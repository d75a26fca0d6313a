use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Outcome reported by the upstream for a single feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStatus {
    Ok,
    Error,
    /// Upstream declined to fetch right now. Not a failure.
    Skipped,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedInfo {
    #[serde(default)]
    pub title: Option<String>,
}

/// One feed item as the upstream delivers it. Every field may be missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawItem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default, rename = "pubDate")]
    pub pub_date: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedPayload {
    pub status: FetchStatus,
    #[serde(default)]
    pub feed: FeedInfo,
    #[serde(default)]
    pub items: Vec<RawItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl FeedPayload {
    pub fn ok(title: Option<String>, items: Vec<RawItem>) -> Self {
        Self {
            status: FetchStatus::Ok,
            feed: FeedInfo { title },
            items,
            message: None,
        }
    }

    pub fn skipped() -> Self {
        Self {
            status: FetchStatus::Skipped,
            feed: FeedInfo::default(),
            items: Vec::new(),
            message: None,
        }
    }
}

/// Boundary to whatever turns a feed URL into structured items.
///
/// Transport failures (network errors, non-2xx responses, timeouts) come back
/// as `Err`. A payload with `FetchStatus::Error` is an upstream-reported
/// failure and is treated the same way by the refresher.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FeedPayload>;
}
