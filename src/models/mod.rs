mod article;
mod feed;

pub use article::{article_view, Article, ArticleFilter};
pub use feed::{Feed, NewFeed};
