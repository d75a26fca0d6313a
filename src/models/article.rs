use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub feed_id: String,
    pub feed_title: String,
    pub title: String,
    /// Plain text, markup already stripped.
    pub description: String,
    /// Raw HTML. Sanitizing is the renderer's job.
    pub content: String,
    pub url: String,
    pub published_at: DateTime<Utc>,
    pub is_read: bool,
    pub is_starred: bool,
    pub is_bookmarked: bool,
    pub author: Option<String>,
    /// Display position from the last view pass. Never persisted.
    #[serde(skip)]
    pub sort_order: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArticleFilter {
    All,
    #[default]
    Unread,
    Starred,
    Bookmarked,
}

impl ArticleFilter {
    pub fn cycle(self) -> Self {
        match self {
            ArticleFilter::All => ArticleFilter::Unread,
            ArticleFilter::Unread => ArticleFilter::Starred,
            ArticleFilter::Starred => ArticleFilter::Bookmarked,
            ArticleFilter::Bookmarked => ArticleFilter::All,
        }
    }

    pub fn matches(self, article: &Article) -> bool {
        match self {
            ArticleFilter::All => true,
            ArticleFilter::Unread => !article.is_read,
            ArticleFilter::Starred => article.is_starred,
            ArticleFilter::Bookmarked => article.is_bookmarked,
        }
    }
}

/// Filter, sort newest first and renumber `sort_order` from zero.
pub fn article_view(
    articles: &[Article],
    filter: ArticleFilter,
    feed_id: Option<&str>,
) -> Vec<Article> {
    let mut view: Vec<Article> = articles
        .iter()
        .filter(|a| feed_id.map_or(true, |id| a.feed_id == id))
        .filter(|a| filter.matches(a))
        .cloned()
        .collect();

    view.sort_by(|a, b| b.published_at.cmp(&a.published_at));

    for (position, article) in view.iter_mut().enumerate() {
        article.sort_order = position;
    }

    view
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn article(id: &str, feed_id: &str, hours_ago: i64, is_read: bool) -> Article {
        Article {
            id: id.to_string(),
            feed_id: feed_id.to_string(),
            feed_title: "Feed".to_string(),
            title: id.to_string(),
            description: String::new(),
            content: String::new(),
            url: format!("https://example.com/{}", id),
            published_at: Utc::now() - Duration::hours(hours_ago),
            is_read,
            is_starred: false,
            is_bookmarked: false,
            author: None,
            sort_order: 99,
        }
    }

    #[test]
    fn view_sorts_newest_first_and_renumbers() {
        let articles = vec![
            article("old", "f1", 10, false),
            article("new", "f1", 1, false),
            article("mid", "f1", 5, false),
        ];

        let view = article_view(&articles, ArticleFilter::All, None);
        let ids: Vec<_> = view.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
        let orders: Vec<_> = view.iter().map(|a| a.sort_order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[test]
    fn view_applies_filter_and_feed() {
        let mut starred = article("s", "f1", 2, true);
        starred.is_starred = true;
        let articles = vec![
            article("unread", "f1", 1, false),
            article("read", "f1", 3, true),
            article("other", "f2", 1, false),
            starred,
        ];

        let unread = article_view(&articles, ArticleFilter::Unread, Some("f1"));
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].id, "unread");

        let starred = article_view(&articles, ArticleFilter::Starred, None);
        assert_eq!(starred.len(), 1);
        assert_eq!(starred[0].sort_order, 0);
    }

    #[test]
    fn filter_cycle_visits_every_variant() {
        let mut filter = ArticleFilter::default();
        let mut seen = vec![filter];
        for _ in 0..3 {
            filter = filter.cycle();
            seen.push(filter);
        }
        assert_eq!(filter.cycle(), ArticleFilter::Unread);
        assert!(seen.contains(&ArticleFilter::All));
        assert!(seen.contains(&ArticleFilter::Bookmarked));
    }
}
