use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{Article, Feed};

/// Persistence the refresher depends on. Storage technology is the
/// implementor's business.
#[async_trait]
pub trait FeedStore: Send + Sync {
    async fn load_feeds(&self) -> Result<Vec<Feed>>;

    /// Insert or replace by id.
    async fn save_feed(&self, feed: &Feed) -> Result<()>;

    /// Removes the feed and every article it owns.
    async fn delete_feed(&self, id: &str) -> Result<()>;

    /// Non-empty urls of the feed's stored articles.
    async fn load_article_urls(&self, feed_id: &str) -> Result<HashSet<String>>;

    async fn load_articles(&self, feed_id: &str) -> Result<Vec<Article>>;

    async fn save_articles(&self, articles: &[Article]) -> Result<()>;

    async fn update_article(&self, article: &Article) -> Result<()>;

    async fn remove_articles(&self, ids: &[String]) -> Result<()>;

    async fn load_last_fetch_time(&self) -> Result<Option<DateTime<Utc>>>;

    async fn save_last_fetch_time(&self, at: DateTime<Utc>) -> Result<()>;
}
