#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tempfile::TempDir;
use tokio::sync::Notify;

use feed_reconciler::db::{FeedStore, Repository};
use feed_reconciler::error::{AppError, Result};
use feed_reconciler::feed::{FeedPayload, FeedSource, RawItem};
use feed_reconciler::models::{Article, Feed};

#[derive(Clone)]
pub enum Script {
    Payload(FeedPayload),
    Fail(String),
}

/// A feed source answering from a url -> response table and recording calls.
#[derive(Default)]
pub struct ScriptedSource {
    responses: Mutex<HashMap<String, Script>>,
    calls: Mutex<Vec<String>>,
    hold: Option<(Arc<Notify>, Arc<Notify>)>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every fetch signals `started` and then waits for `release`.
    pub fn holding(started: Arc<Notify>, release: Arc<Notify>) -> Self {
        Self {
            hold: Some((started, release)),
            ..Self::default()
        }
    }

    pub fn respond(&self, url: &str, script: Script) {
        self.responses.lock().unwrap().insert(url.to_string(), script);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedSource for ScriptedSource {
    async fn fetch(&self, url: &str) -> Result<FeedPayload> {
        self.calls.lock().unwrap().push(url.to_string());

        if let Some((started, release)) = &self.hold {
            started.notify_one();
            release.notified().await;
        }

        let script = self.responses.lock().unwrap().get(url).cloned();
        match script {
            Some(Script::Payload(payload)) => Ok(payload),
            Some(Script::Fail(message)) => Err(AppError::Fetch(message)),
            None => Err(AppError::Fetch(format!("no route to {}", url))),
        }
    }
}

/// Repository-backed store whose article deletes always fail.
pub struct DeleteFailsStore(pub Arc<Repository>);

#[async_trait]
impl FeedStore for DeleteFailsStore {
    async fn load_feeds(&self) -> Result<Vec<Feed>> {
        self.0.load_feeds().await
    }

    async fn save_feed(&self, feed: &Feed) -> Result<()> {
        self.0.save_feed(feed).await
    }

    async fn delete_feed(&self, id: &str) -> Result<()> {
        self.0.delete_feed(id).await
    }

    async fn load_article_urls(&self, feed_id: &str) -> Result<HashSet<String>> {
        self.0.load_article_urls(feed_id).await
    }

    async fn load_articles(&self, feed_id: &str) -> Result<Vec<Article>> {
        self.0.load_articles(feed_id).await
    }

    async fn save_articles(&self, articles: &[Article]) -> Result<()> {
        self.0.save_articles(articles).await
    }

    async fn update_article(&self, article: &Article) -> Result<()> {
        self.0.update_article(article).await
    }

    async fn remove_articles(&self, _ids: &[String]) -> Result<()> {
        Err(AppError::Io(std::io::Error::other("disk full")))
    }

    async fn load_last_fetch_time(&self) -> Result<Option<DateTime<Utc>>> {
        self.0.load_last_fetch_time().await
    }

    async fn save_last_fetch_time(&self, at: DateTime<Utc>) -> Result<()> {
        self.0.save_last_fetch_time(at).await
    }
}

pub async fn test_repo() -> (TempDir, Arc<Repository>) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reader.db");
    let repo = Repository::new(path.to_str().unwrap()).await.unwrap();
    (dir, Arc::new(repo))
}

pub fn feed(id: &str) -> Feed {
    Feed {
        id: id.to_string(),
        title: format!("Feed {}", id),
        url: format!("https://{}.example/rss", id),
        unread_count: 0,
        category: None,
        last_fetch_time: None,
    }
}

pub fn item(link: &str, published: DateTime<Utc>) -> RawItem {
    RawItem {
        title: Some(format!("Item {}", link)),
        description: Some(format!("<p>About {}</p>", link)),
        link: Some(link.to_string()),
        pub_date: Some(published.to_rfc3339()),
        ..Default::default()
    }
}

pub fn payload(title: &str, links: &[&str]) -> Script {
    let now = Utc::now();
    let items = links.iter().map(|l| item(l, now)).collect();
    Script::Payload(FeedPayload::ok(Some(title.to_string()), items))
}

pub fn stored_article(feed: &Feed, url: &str, hours_ago: i64, is_read: bool) -> Article {
    Article {
        id: format!("{}-seed-{}", feed.id, url),
        feed_id: feed.id.clone(),
        feed_title: feed.title.clone(),
        title: url.to_string(),
        description: String::new(),
        content: String::new(),
        url: url.to_string(),
        published_at: Utc::now() - Duration::hours(hours_ago),
        is_read,
        is_starred: false,
        is_bookmarked: false,
        author: None,
        sort_order: 0,
    }
}
