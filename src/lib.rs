#[cfg(feature = "cli")]
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;
pub mod validators;

#[cfg(feature = "cli")]
pub use config::{cli::LocalSource, CliConfig, Settings};

pub use core::engine::{BlockListing, CheckEngine, ListedBlock, Report};
pub use utils::error::{GuardError, Result};
