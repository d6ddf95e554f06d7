mod feed;

pub use feed::parse_feed;
