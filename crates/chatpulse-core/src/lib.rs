pub mod activity;
pub mod color;
pub mod config;
pub mod error;
pub mod graph;
pub mod scale;
pub mod synth;
pub mod traits;
pub mod types;

pub use activity::*;
pub use color::*;
pub use config::{
    ConfigError, LoggingConfig, ScheduleConfig, Settings, SlackConfig, StoreConfig, ENV_PREFIX,
};
pub use error::*;
pub use graph::*;
pub use scale::*;
pub use synth::*;
pub use traits::*;
pub use types::*;
