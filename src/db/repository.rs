use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::feed::parse_pub_date;
use crate::models::{Article, Feed};

use super::schema::SCHEMA;
use super::store::FeedStore;

const LAST_FETCH_KEY: &str = "last_fetch_time";

const FEED_COLUMNS: &str = "id, title, url, unread_count, category, last_fetch_time";

const ARTICLE_COLUMNS: &str = "id, feed_id, feed_title, title, description, content, url, \
     published_at, is_read, is_starred, is_bookmarked, author";

pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;

        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // Feed operations

    pub async fn get_feed(&self, id: &str) -> Result<Option<Feed>> {
        let id = id.to_string();
        let feed = self
            .conn
            .call(move |conn| {
                let sql = format!("SELECT {} FROM feeds WHERE id = ?1", FEED_COLUMNS);
                let feed = conn
                    .query_row(&sql, params![id], feed_from_row)
                    .optional()?;
                Ok(feed)
            })
            .await?;
        Ok(feed)
    }

    /// Renames the feed and its articles' denormalized title in one transaction.
    pub async fn rename_feed(&self, id: &str, title: &str) -> Result<usize> {
        let id = id.to_string();
        let title = title.to_string();
        let changed = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let changed = tx.execute(
                    "UPDATE feeds SET title = ?1 WHERE id = ?2",
                    params![title, id],
                )?;
                tx.execute(
                    "UPDATE articles SET feed_title = ?1 WHERE feed_id = ?2",
                    params![title, id],
                )?;
                tx.commit()?;
                Ok(changed)
            })
            .await?;
        Ok(changed)
    }

    /// Incremental counter update, clamped at zero. The reconciler has the final word.
    pub async fn adjust_unread_count(&self, feed_id: &str, delta: i64) -> Result<()> {
        let feed_id = feed_id.to_string();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE feeds SET unread_count = MAX(0, unread_count + ?1) WHERE id = ?2",
                    params![delta, feed_id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn mark_feed_read(&self, feed_id: &str) -> Result<usize> {
        let feed_id = feed_id.to_string();
        let changed = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let changed = tx.execute(
                    "UPDATE articles SET is_read = 1 WHERE feed_id = ?1 AND is_read = 0",
                    params![feed_id],
                )?;
                tx.execute(
                    "UPDATE feeds SET unread_count = 0 WHERE id = ?1",
                    params![feed_id],
                )?;
                tx.commit()?;
                Ok(changed)
            })
            .await?;
        Ok(changed)
    }

    // Article operations

    pub async fn get_article(&self, id: &str) -> Result<Option<Article>> {
        let id = id.to_string();
        let article = self
            .conn
            .call(move |conn| {
                let sql = format!("SELECT {} FROM articles WHERE id = ?1", ARTICLE_COLUMNS);
                let article = conn
                    .query_row(&sql, params![id], article_from_row)
                    .optional()?;
                Ok(article)
            })
            .await?;
        Ok(article)
    }

    pub async fn all_articles(&self) -> Result<Vec<Article>> {
        let articles = self
            .conn
            .call(|conn| {
                let sql = format!(
                    "SELECT {} FROM articles ORDER BY published_at DESC",
                    ARTICLE_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let articles = stmt
                    .query_map([], article_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(articles)
            })
            .await?;
        Ok(articles)
    }
}

#[async_trait]
impl FeedStore for Repository {
    async fn load_feeds(&self) -> Result<Vec<Feed>> {
        let feeds = self
            .conn
            .call(|conn| {
                let sql = format!("SELECT {} FROM feeds ORDER BY rowid", FEED_COLUMNS);
                let mut stmt = conn.prepare(&sql)?;
                let feeds = stmt
                    .query_map([], feed_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(feeds)
            })
            .await?;
        Ok(feeds)
    }

    async fn save_feed(&self, feed: &Feed) -> Result<()> {
        let feed = feed.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO feeds (id, title, url, unread_count, category, last_fetch_time)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                       ON CONFLICT(id) DO UPDATE SET
                           title = excluded.title,
                           url = excluded.url,
                           unread_count = excluded.unread_count,
                           category = excluded.category,
                           last_fetch_time = excluded.last_fetch_time"#,
                    params![
                        feed.id,
                        feed.title,
                        feed.url,
                        feed.unread_count,
                        feed.category,
                        feed.last_fetch_time.map(|dt| dt.to_rfc3339()),
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn delete_feed(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.conn
            .call(move |conn| {
                conn.execute("DELETE FROM feeds WHERE id = ?1", params![id])?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn load_article_urls(&self, feed_id: &str) -> Result<HashSet<String>> {
        let feed_id = feed_id.to_string();
        let urls = self
            .conn
            .call(move |conn| {
                let mut stmt =
                    conn.prepare("SELECT url FROM articles WHERE feed_id = ?1 AND url <> ''")?;
                let urls = stmt
                    .query_map(params![feed_id], |row| row.get::<_, String>(0))?
                    .collect::<std::result::Result<HashSet<_>, _>>()?;
                Ok(urls)
            })
            .await?;
        Ok(urls)
    }

    async fn load_articles(&self, feed_id: &str) -> Result<Vec<Article>> {
        let feed_id = feed_id.to_string();
        let articles = self
            .conn
            .call(move |conn| {
                let sql = format!(
                    "SELECT {} FROM articles WHERE feed_id = ?1 ORDER BY published_at DESC",
                    ARTICLE_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let articles = stmt
                    .query_map(params![feed_id], article_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(articles)
            })
            .await?;
        Ok(articles)
    }

    async fn save_articles(&self, articles: &[Article]) -> Result<()> {
        if articles.is_empty() {
            return Ok(());
        }
        let articles = articles.to_vec();
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                {
                    // a row that would repeat a (feed_id, url) pair is skipped
                    let mut stmt = tx.prepare(
                        r#"INSERT OR IGNORE INTO articles
                           (id, feed_id, feed_title, title, description, content, url,
                            published_at, is_read, is_starred, is_bookmarked, author)
                           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"#,
                    )?;
                    for a in &articles {
                        stmt.execute(params![
                            a.id,
                            a.feed_id,
                            a.feed_title,
                            a.title,
                            a.description,
                            a.content,
                            a.url,
                            a.published_at.to_rfc3339(),
                            a.is_read,
                            a.is_starred,
                            a.is_bookmarked,
                            a.author,
                        ])?;
                    }
                }
                tx.commit()?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn update_article(&self, article: &Article) -> Result<()> {
        let a = article.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"UPDATE articles SET
                           feed_title = ?2, title = ?3, description = ?4, content = ?5,
                           url = ?6, published_at = ?7, is_read = ?8, is_starred = ?9,
                           is_bookmarked = ?10, author = ?11
                       WHERE id = ?1"#,
                    params![
                        a.id,
                        a.feed_title,
                        a.title,
                        a.description,
                        a.content,
                        a.url,
                        a.published_at.to_rfc3339(),
                        a.is_read,
                        a.is_starred,
                        a.is_bookmarked,
                        a.author,
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn remove_articles(&self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let ids = ids.to_vec();
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                {
                    let mut stmt = tx.prepare("DELETE FROM articles WHERE id = ?1")?;
                    for id in &ids {
                        stmt.execute(params![id])?;
                    }
                }
                tx.commit()?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn load_last_fetch_time(&self) -> Result<Option<DateTime<Utc>>> {
        let value = self
            .conn
            .call(|conn| {
                let value = conn
                    .query_row(
                        "SELECT value FROM settings WHERE key = ?1",
                        params![LAST_FETCH_KEY],
                        |row| row.get::<_, String>(0),
                    )
                    .optional()?;
                Ok(value)
            })
            .await?;
        Ok(value.and_then(|s| parse_pub_date(&s)))
    }

    async fn save_last_fetch_time(&self, at: DateTime<Utc>) -> Result<()> {
        let value = at.to_rfc3339();
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO settings (key, value) VALUES (?1, ?2)
                       ON CONFLICT(key) DO UPDATE SET value = excluded.value"#,
                    params![LAST_FETCH_KEY, value],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

fn feed_from_row(row: &Row) -> rusqlite::Result<Feed> {
    Ok(Feed {
        id: row.get(0)?,
        title: row.get(1)?,
        url: row.get(2)?,
        unread_count: row.get(3)?,
        category: row.get(4)?,
        last_fetch_time: row
            .get::<_, Option<String>>(5)?
            .and_then(|s| parse_pub_date(&s)),
    })
}

fn article_from_row(row: &Row) -> rusqlite::Result<Article> {
    Ok(Article {
        id: row.get(0)?,
        feed_id: row.get(1)?,
        feed_title: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        content: row.get(5)?,
        url: row.get(6)?,
        // unreadable dates sort as oldest
        published_at: parse_pub_date(&row.get::<_, String>(7)?).unwrap_or_default(),
        is_read: row.get(8)?,
        is_starred: row.get(9)?,
        is_bookmarked: row.get(10)?,
        author: row.get(11)?,
        sort_order: 0,
    })
}
