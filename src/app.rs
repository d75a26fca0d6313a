use std::path::Path;
use std::sync::Arc;

use chrono::Utc;

use crate::config::Config;
use crate::db::{FeedStore, Repository};
use crate::error::{AppError, Result};
use crate::feed::{
    dedup_new_feeds, normalize_feed_url, parse_opml_file, read_export_file, write_export_file,
    FeedFetcher, FeedSource, ServiceFetcher,
};
use crate::models::{article_view, Article, ArticleFilter, Feed, NewFeed};
use crate::sync::{FeedRefreshResult, Refresher};

/// Host-facing reader service. Owns the repository and the refresher and
/// keeps an in-memory snapshot of feeds and articles for display.
pub struct App {
    // Data
    pub feeds: Vec<Feed>,
    pub articles: Vec<Article>,
    pub filter: ArticleFilter,

    // Services
    pub repository: Arc<Repository>,
    refresher: Refresher,
}

pub fn build_source(config: &Config) -> Result<Arc<dyn FeedSource>> {
    let source: Arc<dyn FeedSource> = match &config.fetch_service_url {
        Some(endpoint) => Arc::new(ServiceFetcher::new(config, endpoint)?),
        None => Arc::new(FeedFetcher::new(config)?),
    };
    Ok(source)
}

impl App {
    pub async fn new(config: &Config) -> Result<Self> {
        let repository = Arc::new(Repository::new(&config.db_path).await?);
        let source = build_source(config)?;
        Self::with_parts(repository, source, config.refresh_limit_minutes).await
    }

    /// Assemble from explicit parts. Runs one unread-count sweep before loading.
    pub async fn with_parts(
        repository: Arc<Repository>,
        source: Arc<dyn FeedSource>,
        refresh_limit_minutes: u32,
    ) -> Result<Self> {
        let store: Arc<dyn FeedStore> = repository.clone();
        let refresher = Refresher::new(source, store, refresh_limit_minutes);

        let healed = refresher.heal_unread_counts().await?;
        if !healed.is_empty() {
            tracing::info!("Corrected unread counts on {} feeds", healed.len());
        }

        let mut app = Self {
            feeds: Vec::new(),
            articles: Vec::new(),
            filter: ArticleFilter::default(),
            repository,
            refresher,
        };
        app.reload().await?;
        Ok(app)
    }

    pub fn filtered_articles(&self, feed_id: Option<&str>) -> Vec<Article> {
        article_view(&self.articles, self.filter, feed_id)
    }

    pub async fn reload(&mut self) -> Result<()> {
        self.feeds = self.repository.load_feeds().await?;
        self.articles = self.repository.all_articles().await?;
        Ok(())
    }

    // Subscriptions

    pub async fn subscribe(&mut self, url: &str, category: Option<String>) -> Result<FeedRefreshResult> {
        let url = normalize_feed_url(url)?;

        let existing = self.repository.load_feeds().await?;
        let candidate = NewFeed {
            category,
            ..NewFeed::new(url.clone())
        };
        let Some(new_feed) = dedup_new_feeds(&existing, vec![candidate]).pop() else {
            return Err(AppError::AlreadySubscribed(url));
        };

        let feed = new_feed.into_feed();
        self.repository.save_feed(&feed).await?;
        tracing::info!("Subscribed to {}", feed.url);

        let mut results = self.refresher.refresh_added(vec![feed.clone()]).await?;
        self.adopt_upstream_titles(&mut results).await?;
        let result = results
            .pop()
            .ok_or_else(|| AppError::NotFound(feed.id.clone()))?;

        self.reload().await?;
        Ok(result)
    }

    /// A feed still named by its url takes the title the upstream reports.
    async fn adopt_upstream_titles(&self, results: &mut [FeedRefreshResult]) -> Result<()> {
        for result in results.iter_mut() {
            let Some(title) = result.upstream_title.as_deref().map(str::trim) else {
                continue;
            };
            if title.is_empty() || result.feed.title != result.feed.url {
                continue;
            }
            self.repository.rename_feed(&result.feed.id, title).await?;
            result.feed.title = title.to_string();
        }
        Ok(())
    }

    pub async fn unsubscribe(&mut self, feed_id: &str) -> Result<()> {
        if self.repository.get_feed(feed_id).await?.is_none() {
            return Err(AppError::NotFound(feed_id.to_string()));
        }
        self.repository.delete_feed(feed_id).await?;
        self.reload().await
    }

    pub async fn rename_feed(&mut self, feed_id: &str, title: &str) -> Result<()> {
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::Config("feed title cannot be empty".to_string()));
        }
        if self.repository.rename_feed(feed_id, title).await? == 0 {
            return Err(AppError::NotFound(feed_id.to_string()));
        }
        self.reload().await
    }

    // Article state

    async fn article(&self, article_id: &str) -> Result<Article> {
        self.repository
            .get_article(article_id)
            .await?
            .ok_or_else(|| AppError::NotFound(article_id.to_string()))
    }

    /// Sets the read flag and nudges the feed counter by one. The startup and
    /// post-refresh sweeps correct the counter if the two writes ever diverge.
    pub async fn set_read(&mut self, article_id: &str, is_read: bool) -> Result<()> {
        let article = self.article(article_id).await?;
        if article.is_read == is_read {
            return Ok(());
        }

        let mut updated = article.clone();
        updated.is_read = is_read;
        self.repository.update_article(&updated).await?;

        let delta = if is_read { -1 } else { 1 };
        self.repository.adjust_unread_count(&updated.feed_id, delta).await?;

        self.reload().await
    }

    pub async fn mark_feed_read(&mut self, feed_id: &str) -> Result<usize> {
        let changed = self.repository.mark_feed_read(feed_id).await?;
        self.reload().await?;
        Ok(changed)
    }

    pub async fn toggle_starred(&mut self, article_id: &str) -> Result<bool> {
        let mut article = self.article(article_id).await?;
        article.is_starred = !article.is_starred;
        self.repository.update_article(&article).await?;
        self.reload().await?;
        Ok(article.is_starred)
    }

    pub async fn toggle_bookmarked(&mut self, article_id: &str) -> Result<bool> {
        let mut article = self.article(article_id).await?;
        article.is_bookmarked = !article.is_bookmarked;
        self.repository.update_article(&article).await?;
        self.reload().await?;
        Ok(article.is_bookmarked)
    }

    // Refresh

    pub async fn refresh(&mut self, force: bool) -> Result<Vec<FeedRefreshResult>> {
        let feeds = self.repository.load_feeds().await?;
        let mut results = self.refresher.refresh_all(feeds, force).await?;
        self.adopt_upstream_titles(&mut results).await?;
        self.reload().await?;
        Ok(results)
    }

    pub async fn heal_unread_counts(&mut self) -> Result<usize> {
        let corrected = self.refresher.heal_unread_counts().await?;
        self.reload().await?;
        Ok(corrected.len())
    }

    // Import / export

    pub async fn import_json(&mut self, path: &Path) -> Result<Vec<FeedRefreshResult>> {
        let incoming = read_export_file(path)?.into_new_feeds();
        self.import_feeds(incoming).await
    }

    pub async fn import_opml(&mut self, path: &Path) -> Result<Vec<FeedRefreshResult>> {
        let incoming = parse_opml_file(path)?;
        self.import_feeds(incoming).await
    }

    async fn import_feeds(&mut self, incoming: Vec<NewFeed>) -> Result<Vec<FeedRefreshResult>> {
        let offered = incoming.len();
        let existing = self.repository.load_feeds().await?;
        let survivors = dedup_new_feeds(&existing, incoming);

        let mut feeds = Vec::with_capacity(survivors.len());
        for new_feed in survivors {
            let feed = new_feed.into_feed();
            self.repository.save_feed(&feed).await?;
            feeds.push(feed);
        }
        tracing::info!(
            "Imported {} feeds, {} skipped as already subscribed",
            feeds.len(),
            offered - feeds.len()
        );

        // Only the newly added feeds are fetched.
        let mut results = self.refresher.refresh_added(feeds).await?;
        self.adopt_upstream_titles(&mut results).await?;
        self.reload().await?;
        Ok(results)
    }

    pub async fn export_json(&self, path: &Path) -> Result<usize> {
        let feeds = self.repository.load_feeds().await?;
        let count = feeds.len();
        write_export_file(path, feeds, Utc::now())?;
        Ok(count)
    }
}
