use crate::domain::model::{ValidationContext, Violation};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Where source files are read from and written back to.
pub trait SourceStore: Send + Sync {
    fn read_to_string(
        &self,
        path: &str,
    ) -> impl std::future::Future<Output = Result<String>> + Send;
    fn write(&self, path: &str, contents: &str)
        -> impl std::future::Future<Output = Result<()>> + Send;
    /// Files under `paths`, walking directories, minus the `ignore` prefixes.
    fn list_files(
        &self,
        paths: &[String],
        ignore: &[String],
    ) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    /// `KEY=VALUE` extension mappings.
    fn extensions(&self) -> &HashMap<String, String>;
    fn enabled_validators(&self) -> &[String];
    fn disabled_validators(&self) -> &[String];
    fn ignore_paths(&self) -> &[String];
    fn fix(&self) -> bool;
}

/// Checks the blocks of a [`ValidationContext`] and returns violations grouped by file path.
#[async_trait]
pub trait Validator: Send + Sync {
    fn name(&self) -> &'static str;
    async fn validate(
        &self,
        context: Arc<ValidationContext>,
    ) -> Result<HashMap<String, Vec<Violation>>>;
}
