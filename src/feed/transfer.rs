use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use opml::{Outline, OPML};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Feed, NewFeed};

pub const EXPORT_VERSION: &str = "1.0";

/// On-disk subscription backup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportFile {
    pub feeds: Vec<Feed>,
    pub exported_at: DateTime<Utc>,
    pub version: String,
}

impl ExportFile {
    pub fn new(feeds: Vec<Feed>, exported_at: DateTime<Utc>) -> Self {
        Self {
            feeds,
            exported_at,
            version: EXPORT_VERSION.to_string(),
        }
    }

    /// Incoming feeds stripped of identity and counters; ids are reassigned on save.
    pub fn into_new_feeds(self) -> Vec<NewFeed> {
        self.feeds
            .into_iter()
            .map(|f| NewFeed {
                title: f.title,
                url: f.url,
                category: f.category,
            })
            .collect()
    }
}

pub fn write_export_file(path: &Path, feeds: Vec<Feed>, exported_at: DateTime<Utc>) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(&ExportFile::new(feeds, exported_at))?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn read_export_file(path: &Path) -> Result<ExportFile> {
    let content = std::fs::read_to_string(path)?;
    let file: ExportFile = serde_json::from_str(&content)?;
    if file.version != EXPORT_VERSION {
        return Err(AppError::Import(format!(
            "unsupported export version {:?}",
            file.version
        )));
    }
    Ok(file)
}

/// Canonical form of a subscription url, so one feed compares equal however
/// it was typed. Only http and https are accepted.
pub fn normalize_feed_url(raw: &str) -> Result<String> {
    let parsed = Url::parse(raw.trim())?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(AppError::Config(format!(
            "unsupported feed scheme: {}",
            parsed.scheme()
        )));
    }
    Ok(parsed.to_string())
}

/// Drop incoming feeds whose url is already subscribed, repeats earlier in
/// the batch, or is not a usable feed url. Survivors carry the normalized url.
pub fn dedup_new_feeds(existing: &[Feed], incoming: Vec<NewFeed>) -> Vec<NewFeed> {
    let mut seen: HashSet<String> = existing
        .iter()
        .map(|f| normalize_feed_url(&f.url).unwrap_or_else(|_| f.url.clone()))
        .collect();

    incoming
        .into_iter()
        .filter_map(|mut f| match normalize_feed_url(&f.url) {
            Ok(url) => {
                if f.title == f.url {
                    f.title = url.clone();
                }
                f.url = url;
                Some(f)
            }
            Err(e) => {
                if !f.url.trim().is_empty() {
                    tracing::warn!("Skipping feed with unusable url {:?}: {}", f.url, e);
                }
                None
            }
        })
        .filter(|f| seen.insert(f.url.clone()))
        .collect()
}

pub fn parse_opml_file(path: &Path) -> Result<Vec<NewFeed>> {
    let content = std::fs::read_to_string(path)?;
    let opml = OPML::from_str(&content)?;

    let mut feeds = Vec::new();
    collect_outlines(&opml.body.outlines, None, &mut feeds);
    Ok(feeds)
}

fn collect_outlines(outlines: &[Outline], category: Option<&str>, acc: &mut Vec<NewFeed>) {
    for outline in outlines {
        let label = outline
            .title
            .clone()
            .unwrap_or_else(|| outline.text.clone())
            .trim()
            .to_string();

        match &outline.xml_url {
            Some(xml_url) => acc.push(NewFeed {
                title: if label.is_empty() { xml_url.clone() } else { label },
                url: xml_url.clone(),
                category: category.map(str::to_string),
            }),
            // folder
            None => collect_outlines(&outline.outlines, Some(label.as_str()), acc),
        }
    }
}
