mod client;
mod error;
pub mod models;
mod parsers;

pub use client::RssClient;
pub use error::RssError;
pub use models::{Feed, FeedEntry};
pub use parsers::parse_feed;

pub type Result<T> = std::result::Result<T, RssError>;
