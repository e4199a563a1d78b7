pub mod config;
pub mod host;
pub mod logging;
pub mod models;
pub mod paths;

pub use config::{BridgeConfig, Config, ConfigError, LogLevel, LoggingConfig, ValidationError};
pub use host::{HostPlayState, NowPlaying, PlayerHost, RepeatMode, TrackTags};
pub use logging::{init_logging, LoggingError, LoggingGuard};
pub use models::{LoopStatus, PlaybackStatus, TrackId, TrackMetadata};
pub use paths::{AppDirs, DirsError};

pub const APP_NAME: &str = "mprisbee";
pub const APP_AUTHOR: &str = "MPRISBee";
pub const APP_QUALIFIER: &str = "org";
