pub mod config;
pub mod fetcher;
pub mod filter;
pub mod locator;
pub mod media;
pub mod notification;
pub mod parser;
pub mod pipeline;
pub mod relay;
pub mod sources;
pub mod traits;
pub mod types;

pub use config::Config;
pub use fetcher::Fetcher;
pub use filter::TimeWindowFilter;
pub use locator::DirectoryLocator;
pub use media::YtDlpFetcher;
pub use pipeline::{ItemErrorPolicy, ItemOutcome, ItemReport, RelayPipeline, RunReport, SkipReason};
pub use relay::CommandRelay;
pub use sources::YoutubeFeedSource;
pub use traits::{FeedSource, FileLocator, MediaFetcher, Relay};
pub use types::*;
