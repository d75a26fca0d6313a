use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;

use crate::models::Article;

use super::source::RawItem;

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));

/// Remove every `<...>` run. Entities are left alone.
pub fn strip_tags(html: &str) -> String {
    TAG_RE.replace_all(html, "").trim().to_string()
}

pub fn parse_pub_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // rss2json style, implicitly UTC
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Turn raw upstream items into fresh, unread articles for one feed.
///
/// Ids are `{feed_id}-{ingested_at millis}-{index}` so two batches never
/// collide even when the upstream content is identical.
pub fn normalize_items(
    items: Vec<RawItem>,
    feed_id: &str,
    feed_title: &str,
    ingested_at: DateTime<Utc>,
) -> Vec<Article> {
    let stamp = ingested_at.timestamp_millis();

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let raw_description = non_blank(item.description).unwrap_or_default();
            let content = non_blank(item.content).unwrap_or_else(|| raw_description.clone());
            let published_at = item
                .pub_date
                .as_deref()
                .and_then(parse_pub_date)
                .unwrap_or(ingested_at);

            Article {
                id: format!("{}-{}-{}", feed_id, stamp, index),
                feed_id: feed_id.to_string(),
                feed_title: feed_title.to_string(),
                title: non_blank(item.title)
                    .map(|t| t.trim().to_string())
                    .unwrap_or_else(|| "Untitled".to_string()),
                description: strip_tags(&raw_description),
                content,
                url: item.link.map(|l| l.trim().to_string()).unwrap_or_default(),
                published_at,
                is_read: false,
                is_starred: false,
                is_bookmarked: false,
                author: non_blank(item.author),
                sort_order: 0,
            }
        })
        .collect()
}
