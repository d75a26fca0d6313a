use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::db::FeedStore;
use crate::error::{AppError, Result};
use crate::feed::{normalize_items, FeedSource, FetchStatus, RawItem};
use crate::models::{Article, Feed};

use super::merge::{merge, urls_of};
use super::retention::partition_retained;
use super::throttle::{should_fetch_at, ThrottleDecision};
use super::unread::{reconcile, reconcile_all};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshStatus {
    Refreshed,
    /// Upstream answered `skipped`; nothing changed.
    Skipped,
    /// The batch was inside the refresh limit; the feed was not fetched.
    Throttled,
    Failed,
}

/// Outcome for one input feed. `feed` is the post-refresh state when the
/// refresh succeeded and the input feed otherwise.
#[derive(Debug, Clone)]
pub struct FeedRefreshResult {
    pub feed: Feed,
    pub new_articles: Vec<Article>,
    pub error: Option<String>,
    pub status: RefreshStatus,
    pub evicted: usize,
    /// Title the upstream reported for the feed, if any.
    pub upstream_title: Option<String>,
}

impl FeedRefreshResult {
    fn unchanged(feed: Feed, status: RefreshStatus) -> Self {
        Self {
            feed,
            new_articles: Vec::new(),
            error: None,
            status,
            evicted: 0,
            upstream_title: None,
        }
    }

    fn failed(feed: Feed, error: String) -> Self {
        Self {
            error: Some(error),
            ..Self::unchanged(feed, RefreshStatus::Failed)
        }
    }
}

/// Drives fetch, normalize, merge, retention and unread reconciliation over
/// a batch of feeds, one feed at a time and in input order.
///
/// Only one refresh (or sweep) runs at a time; a second `refresh_all` or
/// `refresh_added` while one is in flight fails with `AppError::RefreshInProgress`.
pub struct Refresher {
    source: Arc<dyn FeedSource>,
    store: Arc<dyn FeedStore>,
    refresh_limit_minutes: u32,
    in_flight: Mutex<()>,
}

impl Refresher {
    pub fn new(
        source: Arc<dyn FeedSource>,
        store: Arc<dyn FeedStore>,
        refresh_limit_minutes: u32,
    ) -> Self {
        Self {
            source,
            store,
            refresh_limit_minutes,
            in_flight: Mutex::new(()),
        }
    }

    /// Throttle decision against the persisted last fetch time.
    pub async fn throttle_decision(&self, now: DateTime<Utc>) -> ThrottleDecision {
        let last = match self.store.load_last_fetch_time().await {
            Ok(last) => last,
            Err(e) => {
                tracing::warn!("Could not read last fetch time, treating as never fetched: {}", e);
                None
            }
        };
        should_fetch_at(self.refresh_limit_minutes, last, now)
    }

    /// Refresh every feed in `feeds`. Returns exactly one result per feed, in order.
    ///
    /// A failing feed never affects the others. `force` skips the throttle.
    /// The batch start is recorded as the last fetch time, which the next
    /// unforced run is throttled against.
    pub async fn refresh_all(&self, feeds: Vec<Feed>, force: bool) -> Result<Vec<FeedRefreshResult>> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| AppError::RefreshInProgress)?;

        let started = Utc::now();

        if !force {
            let decision = self.throttle_decision(started).await;
            if !decision.eligible {
                tracing::info!(
                    "Refresh suppressed ({}), {} feeds untouched",
                    decision.reason.as_str(),
                    feeds.len()
                );
                return Ok(feeds
                    .into_iter()
                    .map(|f| FeedRefreshResult::unchanged(f, RefreshStatus::Throttled))
                    .collect());
            }
            tracing::debug!("Refresh allowed ({})", decision.reason.as_str());
        }

        let results = self.run_batch(feeds, started).await;

        if let Err(e) = self.store.save_last_fetch_time(started).await {
            tracing::warn!("Could not record last fetch time: {}", e);
        }
        Ok(results)
    }

    /// Fetch feeds that were just added. Always runs, and leaves the shared
    /// last fetch time alone so the rest of the subscriptions are not
    /// throttled by it.
    pub async fn refresh_added(&self, feeds: Vec<Feed>) -> Result<Vec<FeedRefreshResult>> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| AppError::RefreshInProgress)?;

        Ok(self.run_batch(feeds, Utc::now()).await)
    }

    async fn run_batch(&self, feeds: Vec<Feed>, started: DateTime<Utc>) -> Vec<FeedRefreshResult> {
        let mut results = Vec::with_capacity(feeds.len());
        for feed in feeds {
            results.push(self.refresh_feed(feed, started).await);
        }

        let failed = results.iter().filter(|r| r.error.is_some()).count();
        let fresh: usize = results.iter().map(|r| r.new_articles.len()).sum();
        tracing::info!(
            "Refreshed {} feeds ({} failed), {} new articles",
            results.len(),
            failed,
            fresh
        );
        results
    }

    async fn refresh_feed(&self, feed: Feed, now: DateTime<Utc>) -> FeedRefreshResult {
        let payload = match self.source.fetch(&feed.url).await {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("Failed to fetch {}: {}", feed.url, e);
                return FeedRefreshResult::failed(feed, e.to_string());
            }
        };

        match payload.status {
            FetchStatus::Ok => {}
            FetchStatus::Skipped => {
                tracing::debug!("Upstream skipped {}", feed.url);
                return FeedRefreshResult::unchanged(feed, RefreshStatus::Skipped);
            }
            FetchStatus::Error => {
                let message = payload
                    .message
                    .unwrap_or_else(|| "upstream reported an error".to_string());
                tracing::warn!("Upstream error for {}: {}", feed.url, message);
                return FeedRefreshResult::failed(feed, message);
            }
        }

        let upstream_title = payload.feed.title;
        let result = self.apply_items(feed, payload.items, now).await;
        FeedRefreshResult {
            upstream_title,
            ..result
        }
    }

    async fn apply_items(&self, feed: Feed, items: Vec<RawItem>, now: DateTime<Utc>) -> FeedRefreshResult {
        let candidates = normalize_items(items, &feed.id, &feed.title, now);
        let upstream_urls = urls_of(&candidates);

        // save_articles is all-or-nothing, so a failure here leaves no trace
        let new_articles = match self.insert_new(&feed, candidates).await {
            Ok(new_articles) => new_articles,
            Err(e) => {
                tracing::warn!("Failed to store refresh of {}: {}", feed.url, e);
                return FeedRefreshResult::failed(feed, e.to_string());
            }
        };

        match self.clean_up(&feed, &upstream_urls, now).await {
            Ok((updated, evicted)) => {
                tracing::debug!(
                    "{}: {} new, {} evicted, {} unread",
                    updated.title,
                    new_articles.len(),
                    evicted,
                    updated.unread_count
                );
                FeedRefreshResult {
                    feed: updated,
                    new_articles,
                    error: None,
                    status: RefreshStatus::Refreshed,
                    evicted,
                    upstream_title: None,
                }
            }
            Err(e) => {
                tracing::warn!(
                    "Cleanup of {} failed after storing {} new articles: {}",
                    feed.url,
                    new_articles.len(),
                    e
                );
                // the new rows are committed, so the counter must follow them
                let feed = self.recount(feed).await;
                FeedRefreshResult {
                    new_articles,
                    ..FeedRefreshResult::failed(feed, e.to_string())
                }
            }
        }
    }

    async fn insert_new(&self, feed: &Feed, candidates: Vec<Article>) -> Result<Vec<Article>> {
        let existing = self.store.load_article_urls(&feed.id).await?;
        let new_articles = merge(&existing, candidates);
        self.store.save_articles(&new_articles).await?;
        Ok(new_articles)
    }

    /// Retention pass and counter update. Returns the saved feed and the
    /// number of evicted articles.
    async fn clean_up(
        &self,
        feed: &Feed,
        upstream_urls: &HashSet<String>,
        now: DateTime<Utc>,
    ) -> Result<(Feed, usize)> {
        let stored = self.store.load_articles(&feed.id).await?;
        let (kept, evicted) = partition_retained(stored, upstream_urls, Utc::now());
        let evicted_ids: Vec<String> = evicted.into_iter().map(|a| a.id).collect();
        self.store.remove_articles(&evicted_ids).await?;

        let mut updated = feed.clone();
        updated.unread_count = reconcile(&updated, &kept);
        updated.last_fetch_time = Some(now);
        self.store.save_feed(&updated).await?;
        Ok((updated, evicted_ids.len()))
    }

    /// Best-effort counter fix for a feed whose pass stopped half way.
    /// `last_fetch_time` is left as it was.
    async fn recount(&self, feed: Feed) -> Feed {
        let articles = match self.store.load_articles(&feed.id).await {
            Ok(articles) => articles,
            Err(e) => {
                tracing::warn!("Could not recount {}: {}", feed.url, e);
                return feed;
            }
        };

        let mut updated = feed.clone();
        updated.unread_count = reconcile(&updated, &articles);
        if updated.unread_count == feed.unread_count {
            return feed;
        }
        match self.store.save_feed(&updated).await {
            Ok(()) => updated,
            Err(e) => {
                tracing::warn!("Could not recount {}: {}", feed.url, e);
                feed
            }
        }
    }

    /// Recompute every feed's unread counter from its stored articles and
    /// persist the ones that drifted. Returns the corrected feeds.
    pub async fn heal_unread_counts(&self) -> Result<Vec<Feed>> {
        let _guard = self.in_flight.lock().await;

        let feeds = self.store.load_feeds().await?;
        let mut articles = Vec::new();
        for feed in &feeds {
            articles.extend(self.store.load_articles(&feed.id).await?);
        }

        let corrected = reconcile_all(&feeds, &articles);
        for feed in &corrected {
            self.store.save_feed(feed).await?;
        }
        Ok(corrected)
    }
}
