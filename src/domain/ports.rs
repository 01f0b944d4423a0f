use crate::domain::model::{EntityKind, Record};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Key/value persistence standing in for the browser's local storage.
pub trait Storage: Send + Sync {
    fn read_key(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Option<Vec<u8>>>> + Send;
    fn write_key(
        &self,
        key: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn remove_key(&self, key: &str) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn api_base_url(&self) -> &str;
    fn auth_token(&self) -> Option<&str>;
    fn endpoint_for(&self, kind: EntityKind) -> String {
        kind.default_endpoint().to_string()
    }
    fn request_timeout(&self) -> Duration;
    fn cache_duration(&self) -> chrono::Duration;
    fn search_limit(&self) -> usize;
    fn data_dir(&self) -> &str;
    fn grid_columns(&self) -> u32;
}

/// Anything that can produce the full collection of an entity type.
#[async_trait]
pub trait ResourceSource: Send + Sync {
    async fn fetch_all(&self, kind: EntityKind) -> Result<Vec<Record>>;
}
