pub mod config;
pub mod domain;
pub mod error;
pub mod git;
pub mod publisher;
pub mod ui;

pub use error::{BatchPushError, Result};
pub use publisher::{PublishOptions, PublishSummary, Publisher};
