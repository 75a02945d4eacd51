pub mod blocks;
pub mod comments;
pub mod diff;
pub mod engine;
pub mod fixer;
pub mod languages;
pub mod tags;

pub use crate::domain::model::{Block, FileBlocks, Violation};
pub use crate::domain::ports::{ConfigProvider, SourceStore, Validator};
pub use crate::utils::error::Result;
