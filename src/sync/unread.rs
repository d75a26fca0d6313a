use std::collections::HashMap;

use crate::models::{Article, Feed};

/// Ground-truth unread count for `feed`. Articles of other feeds are ignored.
pub fn reconcile(feed: &Feed, articles: &[Article]) -> u32 {
    let count = articles
        .iter()
        .filter(|a| a.feed_id == feed.id && !a.is_read)
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Full sweep. Returns corrected copies of the feeds whose counter drifted.
pub fn reconcile_all(feeds: &[Feed], articles: &[Article]) -> Vec<Feed> {
    let mut unread: HashMap<&str, u32> = HashMap::new();
    for article in articles.iter().filter(|a| !a.is_read) {
        *unread.entry(article.feed_id.as_str()).or_default() += 1;
    }

    feeds
        .iter()
        .filter_map(|feed| {
            let actual = unread.get(feed.id.as_str()).copied().unwrap_or(0);
            if feed.unread_count == actual {
                return None;
            }
            tracing::warn!(
                "Unread count drift on {}: stored {}, actual {}",
                feed.title,
                feed.unread_count,
                actual
            );
            let mut fixed = feed.clone();
            fixed.unread_count = actual;
            Some(fixed)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn feed(id: &str, unread_count: u32) -> Feed {
        Feed {
            id: id.to_string(),
            title: id.to_uppercase(),
            url: format!("https://{}.example/rss", id),
            unread_count,
            category: None,
            last_fetch_time: None,
        }
    }

    fn article(feed_id: &str, n: usize, is_read: bool) -> Article {
        Article {
            id: format!("{}-{}", feed_id, n),
            feed_id: feed_id.to_string(),
            feed_title: feed_id.to_uppercase(),
            title: String::new(),
            description: String::new(),
            content: String::new(),
            url: format!("https://{}.example/{}", feed_id, n),
            published_at: Utc::now(),
            is_read,
            is_starred: false,
            is_bookmarked: false,
            author: None,
            sort_order: 0,
        }
    }

    #[test]
    fn counts_only_unread_of_this_feed() {
        let articles = vec![
            article("f1", 0, false),
            article("f1", 1, true),
            article("f1", 2, false),
            article("f2", 0, false),
        ];

        assert_eq!(reconcile(&feed("f1", 0), &articles), 2);
        assert_eq!(reconcile(&feed("f2", 0), &articles), 1);
        assert_eq!(reconcile(&feed("f3", 0), &articles), 0);
    }

    #[test]
    fn sweep_corrects_only_drifted_feeds() {
        let feeds = vec![feed("f1", 5), feed("f2", 1), feed("f3", 2)];
        let articles = vec![article("f1", 0, false), article("f2", 0, false)];

        let fixed = reconcile_all(&feeds, &articles);
        assert_eq!(fixed.len(), 2);
        assert_eq!((fixed[0].id.as_str(), fixed[0].unread_count), ("f1", 1));
        assert_eq!((fixed[1].id.as_str(), fixed[1].unread_count), ("f3", 0));

        for feed in &fixed {
            assert_eq!(feed.unread_count, reconcile(feed, &articles));
        }
    }

    #[test]
    fn sweep_of_consistent_state_is_empty() {
        let feeds = vec![feed("f1", 1)];
        let articles = vec![article("f1", 0, false), article("f1", 1, true)];
        assert!(reconcile_all(&feeds, &articles).is_empty());
    }
}
