pub mod youtube_feed;

pub use youtube_feed::YoutubeFeedSource;
