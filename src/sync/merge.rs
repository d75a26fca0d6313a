use std::collections::HashSet;

use crate::models::Article;

/// Keep the candidates that are genuinely new to a feed.
///
/// An article is new when it has a non-empty url that is neither in
/// `existing_urls` nor taken by an earlier candidate of the same batch.
/// Articles without a url are never ingested: they have no dedup key, and
/// treating them as distinct would re-add them on every refresh.
pub fn merge(existing_urls: &HashSet<String>, candidates: Vec<Article>) -> Vec<Article> {
    let mut taken: HashSet<String> = HashSet::new();
    let total = candidates.len();

    let fresh: Vec<Article> = candidates
        .into_iter()
        .filter(|a| !a.url.is_empty())
        .filter(|a| !existing_urls.contains(&a.url))
        .filter(|a| taken.insert(a.url.clone()))
        .collect();

    tracing::debug!("merge: {} of {} candidates are new", fresh.len(), total);
    fresh
}

pub fn urls_of(articles: &[Article]) -> HashSet<String> {
    articles
        .iter()
        .filter(|a| !a.url.is_empty())
        .map(|a| a.url.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn candidate(index: usize, url: &str) -> Article {
        Article {
            id: format!("f1-0-{}", index),
            feed_id: "f1".to_string(),
            feed_title: "Feed".to_string(),
            title: format!("Item {}", index),
            description: String::new(),
            content: String::new(),
            url: url.to_string(),
            published_at: Utc::now(),
            is_read: false,
            is_starred: false,
            is_bookmarked: false,
            author: None,
            sort_order: 0,
        }
    }

    fn set(urls: &[&str]) -> HashSet<String> {
        urls.iter().map(|u| u.to_string()).collect()
    }

    #[test]
    fn known_urls_are_filtered() {
        let candidates = vec![candidate(0, "a"), candidate(1, "b"), candidate(2, "c")];

        let fresh = merge(&set(&["b"]), candidates);
        let urls: Vec<_> = fresh.iter().map(|a| a.url.as_str()).collect();
        assert_eq!(urls, vec!["a", "c"]);
    }

    #[test]
    fn merge_is_idempotent() {
        let existing = set(&["x"]);
        let candidates = vec![candidate(0, "x"), candidate(1, "y"), candidate(2, "z")];

        let first = merge(&existing, candidates.clone());
        assert_eq!(first.len(), 2);

        // Same inputs twice: same answer, nothing extra.
        assert_eq!(merge(&existing, candidates.clone()), first);

        let mut grown = existing.clone();
        grown.extend(urls_of(&first));
        assert!(merge(&grown, candidates).is_empty());
    }

    #[test]
    fn empty_urls_are_never_merged() {
        let candidates = vec![candidate(0, ""), candidate(1, ""), candidate(2, "a")];

        let fresh = merge(&HashSet::new(), candidates);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].url, "a");
    }

    #[test]
    fn repeated_url_in_one_batch_is_taken_once() {
        let candidates = vec![candidate(0, "a"), candidate(1, "a"), candidate(2, "b")];

        let fresh = merge(&HashSet::new(), candidates);
        let ids: Vec<_> = fresh.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["f1-0-0", "f1-0-2"]);
    }
}
