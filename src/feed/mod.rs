mod fetcher;
mod normalizer;
mod service;
mod source;
mod transfer;

pub use fetcher::FeedFetcher;
pub use normalizer::{normalize_items, parse_pub_date, strip_tags};
pub use service::ServiceFetcher;
pub use source::{FeedInfo, FeedPayload, FeedSource, FetchStatus, RawItem};
pub use transfer::{
    dedup_new_feeds, normalize_feed_url, parse_opml_file, read_export_file, write_export_file,
    ExportFile, EXPORT_VERSION,
};
