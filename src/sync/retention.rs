use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};

use crate::models::Article;

/// Articles published within this window survive cleanup regardless of state.
pub const RETENTION_WINDOW_HOURS: i64 = 48;

fn is_retained(article: &Article, upstream_urls: &HashSet<String>, cutoff: DateTime<Utc>) -> bool {
    !article.is_read
        || article.is_starred
        || article.is_bookmarked
        || article.published_at > cutoff
        || upstream_urls.contains(&article.url)
}

/// Split into `(kept, evicted)` as of `now`.
pub fn partition_retained(
    articles: Vec<Article>,
    upstream_urls: &HashSet<String>,
    now: DateTime<Utc>,
) -> (Vec<Article>, Vec<Article>) {
    let cutoff = now - Duration::hours(RETENTION_WINDOW_HOURS);
    articles
        .into_iter()
        .partition(|a| is_retained(a, upstream_urls, cutoff))
}

pub fn retain_at(
    articles: Vec<Article>,
    upstream_urls: &HashSet<String>,
    now: DateTime<Utc>,
) -> Vec<Article> {
    partition_retained(articles, upstream_urls, now).0
}

/// Retention against the wall clock. Results drift as time passes.
pub fn retain(articles: Vec<Article>, upstream_urls: &HashSet<String>) -> Vec<Article> {
    retain_at(articles, upstream_urls, Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(url: &str, hours_ago: i64, now: DateTime<Utc>) -> Article {
        Article {
            id: url.to_string(),
            feed_id: "f1".to_string(),
            feed_title: "F1".to_string(),
            title: url.to_string(),
            description: String::new(),
            content: String::new(),
            url: url.to_string(),
            published_at: now - Duration::hours(hours_ago),
            is_read: true,
            is_starred: false,
            is_bookmarked: false,
            author: None,
            sort_order: 0,
        }
    }

    #[test]
    fn engaged_articles_always_survive() {
        let now = Utc::now();
        let mut unread = article("unread", 1000, now);
        unread.is_read = false;
        let mut starred = article("starred", 1000, now);
        starred.is_starred = true;
        let mut bookmarked = article("bookmarked", 1000, now);
        bookmarked.is_bookmarked = true;

        let kept = retain_at(
            vec![unread.clone(), starred.clone(), bookmarked.clone()],
            &HashSet::new(),
            now,
        );
        assert_eq!(kept, vec![unread, starred, bookmarked]);
    }

    #[test]
    fn recent_and_upstream_articles_survive() {
        let now = Utc::now();
        let recent = article("recent", 47, now);
        let live = article("live", 500, now);
        let stale = article("stale", 49, now);
        let upstream: HashSet<String> = ["live".to_string()].into_iter().collect();

        let (kept, evicted) =
            partition_retained(vec![recent.clone(), live.clone(), stale.clone()], &upstream, now);
        assert_eq!(kept, vec![recent, live]);
        assert_eq!(evicted, vec![stale]);
    }

    #[test]
    fn window_edge_is_evicted() {
        let now = Utc::now();
        let edge = article("edge", RETENTION_WINDOW_HOURS, now);
        assert!(retain_at(vec![edge], &HashSet::new(), now).is_empty());
    }

    #[test]
    fn stale_read_article_missing_upstream_is_evicted() {
        let now = Utc::now();
        let mut a = article("a", 72, now);
        a.is_read = false;
        let b = article("b", 72, now);
        let upstream: HashSet<String> = ["a".to_string()].into_iter().collect();

        let kept = retain(vec![a.clone(), b], &upstream);
        assert_eq!(kept, vec![a]);
    }

    #[test]
    fn outcome_depends_on_evaluation_time() {
        let now = Utc::now();
        let a = article("a", 24, now);

        assert_eq!(retain_at(vec![a.clone()], &HashSet::new(), now).len(), 1);
        let later = now + Duration::hours(25);
        assert!(retain_at(vec![a], &HashSet::new(), later).is_empty());
    }
}
