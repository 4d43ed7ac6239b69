// groupsconnector/src/graph/mod.rs
pub(crate) mod client;
pub(crate) mod items;
pub(crate) mod models;
pub(crate) mod schema;

use async_trait::async_trait;

use crate::errors::Result;
use models::{ConnectionOperation, DirectoryGroup, ExternalConnection, ExternalItem, Schema};

pub use client::GraphClient;

/// Remote search index: connections, their schema and their items.
#[async_trait]
pub trait IndexClient: Send + Sync {
    async fn create_connection(
        &self,
        id: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<ExternalConnection>;

    async fn list_connections(&self) -> Result<Vec<ExternalConnection>>;

    async fn delete_connection(&self, connection_id: &str) -> Result<()>;

    /// Starts asynchronous registration and returns the operation id to poll.
    async fn register_schema(&self, connection_id: &str, schema: &Schema) -> Result<String>;

    async fn get_operation(
        &self,
        connection_id: &str,
        operation_id: &str,
    ) -> Result<ConnectionOperation>;

    async fn get_schema(&self, connection_id: &str) -> Result<Schema>;

    /// Full replace of the item with the same id.
    async fn upsert_item(&self, connection_id: &str, item: &ExternalItem) -> Result<()>;

    async fn delete_item(&self, connection_id: &str, item_id: &str) -> Result<()>;
}

/// Source of directory groups.
#[async_trait]
pub trait GroupDirectory: Send + Sync {
    /// The complete current snapshot, all pages.
    async fn list_groups(&self) -> Result<Vec<DirectoryGroup>>;
}
