use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A subscribed feed. `url` is the identity used to reject re-imports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feed {
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub unread_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_fetch_time: Option<DateTime<Utc>>,
}

/// A feed the user asked for but that has no identity yet.
#[derive(Debug, Clone)]
pub struct NewFeed {
    pub title: String,
    pub url: String,
    pub category: Option<String>,
}

impl NewFeed {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            title: url.clone(),
            url,
            category: None,
        }
    }

    pub fn into_feed(self) -> Feed {
        Feed {
            id: Uuid::new_v4().to_string(),
            title: self.title,
            url: self.url,
            unread_count: 0,
            category: self.category,
            last_fetch_time: None,
        }
    }
}
