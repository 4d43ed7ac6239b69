// groupsconnector/src/testing.rs
//! In-memory collaborators shared by the unit tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use crate::errors::{AppError, Result};
use crate::graph::models::{
    ConnectionOperation, DirectoryGroup, ExternalConnection, ExternalItem, OperationError,
    OperationStatus, Schema,
};
use crate::graph::{GroupDirectory, IndexClient};
use crate::store::WatermarkStore;

fn service_error(status: StatusCode, code: &str) -> AppError {
    AppError::Service {
        status,
        code: code.to_string(),
        message: format!("simulated {}", code),
    }
}

#[derive(Default)]
struct IndexState {
    connections: Vec<ExternalConnection>,
    upserted: Vec<String>,
    deleted: Vec<String>,
    failing_upserts: HashSet<String>,
    failing_deletes: HashSet<String>,
    missing_items: HashSet<String>,
    fail_connection_calls: bool,
    schemas: Vec<(String, Schema)>,
    statuses: VecDeque<OperationStatus>,
    operation_checks: u32,
}

pub struct FakeIndex {
    state: Mutex<IndexState>,
}

impl FakeIndex {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(IndexState::default()),
        }
    }

    pub fn with_connections(self, connections: Vec<ExternalConnection>) -> Self {
        self.state.lock().unwrap().connections = connections;
        self
    }

    /// The last status repeats once the queue runs dry.
    pub fn with_operation_statuses(self, statuses: Vec<OperationStatus>) -> Self {
        self.state.lock().unwrap().statuses = statuses.into();
        self
    }

    pub fn failing_upserts(self, ids: &[&str]) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_upserts
            .extend(ids.iter().map(|s| s.to_string()));
        self
    }

    pub fn failing_deletes(self, ids: &[&str]) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_deletes
            .extend(ids.iter().map(|s| s.to_string()));
        self
    }

    pub fn missing_items(self, ids: &[&str]) -> Self {
        self.state
            .lock()
            .unwrap()
            .missing_items
            .extend(ids.iter().map(|s| s.to_string()));
        self
    }

    pub fn failing_connection_calls(self) -> Self {
        self.state.lock().unwrap().fail_connection_calls = true;
        self
    }

    pub fn clear_failures(&self) {
        let mut state = self.state.lock().unwrap();
        state.failing_upserts.clear();
        state.failing_deletes.clear();
    }

    pub fn connections(&self) -> Vec<ExternalConnection> {
        self.state.lock().unwrap().connections.clone()
    }

    pub fn upserted_ids(&self) -> Vec<String> {
        self.state.lock().unwrap().upserted.clone()
    }

    pub fn deleted_ids(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted.clone()
    }

    pub fn registered_schemas(&self) -> Vec<(String, Schema)> {
        self.state.lock().unwrap().schemas.clone()
    }

    pub fn operation_checks(&self) -> u32 {
        self.state.lock().unwrap().operation_checks
    }
}

#[async_trait]
impl IndexClient for FakeIndex {
    async fn create_connection(
        &self,
        id: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<ExternalConnection> {
        let mut state = self.state.lock().unwrap();
        if state.fail_connection_calls || state.connections.iter().any(|c| c.id == id) {
            return Err(service_error(StatusCode::CONFLICT, "NameAlreadyExists"));
        }
        let connection = ExternalConnection {
            id: id.to_string(),
            name: name.to_string(),
            description: description.map(str::to_string),
            state: Some("draft".to_string()),
        };
        state.connections.push(connection.clone());
        Ok(connection)
    }

    async fn list_connections(&self) -> Result<Vec<ExternalConnection>> {
        let state = self.state.lock().unwrap();
        if state.fail_connection_calls {
            return Err(service_error(StatusCode::FORBIDDEN, "Forbidden"));
        }
        Ok(state.connections.clone())
    }

    async fn delete_connection(&self, connection_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_connection_calls {
            return Err(service_error(StatusCode::FORBIDDEN, "Forbidden"));
        }
        let before = state.connections.len();
        state.connections.retain(|c| c.id != connection_id);
        if state.connections.len() == before {
            return Err(service_error(StatusCode::NOT_FOUND, "ItemNotFound"));
        }
        Ok(())
    }

    async fn register_schema(&self, connection_id: &str, schema: &Schema) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        if state.fail_connection_calls {
            return Err(service_error(StatusCode::BAD_REQUEST, "BadRequest"));
        }
        state.schemas.push((connection_id.to_string(), schema.clone()));
        Ok(format!("op-{}", state.schemas.len()))
    }

    async fn get_operation(
        &self,
        _connection_id: &str,
        operation_id: &str,
    ) -> Result<ConnectionOperation> {
        let mut state = self.state.lock().unwrap();
        state.operation_checks += 1;
        let status = if state.statuses.len() > 1 {
            state.statuses.pop_front().unwrap_or(OperationStatus::Completed)
        } else {
            state.statuses.front().copied().unwrap_or(OperationStatus::Completed)
        };
        let error = (status == OperationStatus::Failed).then(|| OperationError {
            code: "SchemaInvalid".to_string(),
            message: "property rejected".to_string(),
        });
        Ok(ConnectionOperation {
            id: operation_id.to_string(),
            status,
            error,
        })
    }

    async fn get_schema(&self, connection_id: &str) -> Result<Schema> {
        let state = self.state.lock().unwrap();
        state
            .schemas
            .iter()
            .rev()
            .find(|(id, _)| id == connection_id)
            .map(|(_, schema)| schema.clone())
            .ok_or_else(|| service_error(StatusCode::NOT_FOUND, "SchemaNotFound"))
    }

    async fn upsert_item(&self, _connection_id: &str, item: &ExternalItem) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing_upserts.contains(&item.id) {
            return Err(service_error(StatusCode::INTERNAL_SERVER_ERROR, "InternalError"));
        }
        state.upserted.push(item.id.clone());
        Ok(())
    }

    async fn delete_item(&self, _connection_id: &str, item_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.missing_items.contains(item_id) {
            return Err(service_error(StatusCode::NOT_FOUND, "ItemNotFound"));
        }
        if state.failing_deletes.contains(item_id) {
            return Err(service_error(StatusCode::SERVICE_UNAVAILABLE, "ServiceUnavailable"));
        }
        state.deleted.push(item_id.to_string());
        Ok(())
    }
}

pub struct FakeDirectory {
    groups: Mutex<Vec<DirectoryGroup>>,
    fail: bool,
}

impl FakeDirectory {
    pub fn new(groups: Vec<DirectoryGroup>) -> Self {
        Self {
            groups: Mutex::new(groups),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            groups: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn set_groups(&self, groups: Vec<DirectoryGroup>) {
        *self.groups.lock().unwrap() = groups;
    }
}

#[async_trait]
impl GroupDirectory for FakeDirectory {
    async fn list_groups(&self) -> Result<Vec<DirectoryGroup>> {
        if self.fail {
            return Err(service_error(StatusCode::UNAUTHORIZED, "InvalidAuthenticationToken"));
        }
        Ok(self.groups.lock().unwrap().clone())
    }
}

pub struct MemoryWatermarkStore {
    value: Mutex<Option<DateTime<Utc>>>,
    writes: Mutex<usize>,
}

impl MemoryWatermarkStore {
    pub fn new(initial: Option<DateTime<Utc>>) -> Self {
        Self {
            value: Mutex::new(initial),
            writes: Mutex::new(0),
        }
    }

    pub fn current(&self) -> Option<DateTime<Utc>> {
        *self.value.lock().unwrap()
    }

    pub fn writes(&self) -> usize {
        *self.writes.lock().unwrap()
    }
}

#[async_trait]
impl WatermarkStore for MemoryWatermarkStore {
    async fn read(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.current())
    }

    async fn write(&self, watermark: DateTime<Utc>) -> Result<()> {
        *self.value.lock().unwrap() = Some(watermark);
        *self.writes.lock().unwrap() += 1;
        Ok(())
    }
}
