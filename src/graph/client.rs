// groupsconnector/src/graph/client.rs
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, LOCATION};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use url::Url;

use super::models::{
    ConnectionOperation, DirectoryGroup, ErrorEnvelope, ExternalConnection, ExternalItem, Page,
    Schema,
};
use super::{GroupDirectory, IndexClient};
use crate::config::GraphConfig;
use crate::errors::{AppError, Result};

const GROUP_SELECT: &str = "id,displayName,description";

/// Thin REST client for the Graph endpoints the connector needs.
#[derive(Clone)]
pub struct GraphClient {
    client: Client,
    base_url: Url,
}

impl GraphClient {
    pub fn new(config: &GraphConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.access_token))
            .map_err(|_| AppError::Config("access token contains invalid characters".to_string()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;
        let base_url = Url::parse(config.base_url.trim_end_matches('/'))?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::Config(format!(
                "{} cannot be used as an API root",
                config.base_url
            )));
        }
        Ok(Self { client, base_url })
    }

    /// Appends `segments` to the API root, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::Config(format!("{} cannot be used as an API root", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn connection_url(&self, connection_id: &str, rest: &[&str]) -> Result<Url> {
        let mut segments = vec!["external", "connections", connection_id];
        segments.extend_from_slice(rest);
        self.endpoint(&segments)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        if response.status().is_success() {
            return Ok(response);
        }
        Err(service_error(response).await)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn get_all_pages<T: DeserializeOwned>(&self, first_url: String) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(first_url);
        while let Some(url) = next {
            let page: Page<T> = self.send_json(self.client.get(&url)).await?;
            items.extend(page.value);
            next = page.next_link;
        }
        Ok(items)
    }
}

/// Turns a non-success response into `AppError::Service`, preferring the Graph error body.
async fn service_error(response: Response) -> AppError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorEnvelope>(&body)
        .ok()
        .and_then(|envelope| envelope.error);
    match detail {
        Some(detail) => AppError::Service {
            status,
            code: detail.code,
            message: detail.message,
        },
        None => AppError::Service {
            status,
            code: status
                .canonical_reason()
                .unwrap_or("UnknownError")
                .to_string(),
            message: body,
        },
    }
}

/// The operation id is the last path segment of the `Location` header.
pub(crate) fn operation_id_from_location(location: &str) -> Result<String> {
    let url = Url::parse(location)?;
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(str::to_string)
        .ok_or_else(|| {
            AppError::InvalidInput(format!("no operation id in Location header {}", location))
        })
}

#[async_trait]
impl IndexClient for GraphClient {
    async fn create_connection(
        &self,
        id: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<ExternalConnection> {
        let body = ExternalConnection {
            id: id.to_string(),
            name: name.to_string(),
            description: description.map(str::to_string),
            state: None,
        };
        tracing::info!(connection_id = id, "creating connection");
        let url = self.endpoint(&["external", "connections"])?;
        self.send_json(self.client.post(url).json(&body)).await
    }

    async fn list_connections(&self) -> Result<Vec<ExternalConnection>> {
        let url = self.endpoint(&["external", "connections"])?;
        self.get_all_pages(url.into()).await
    }

    async fn delete_connection(&self, connection_id: &str) -> Result<()> {
        tracing::info!(connection_id, "deleting connection");
        self.send(self.client.delete(self.connection_url(connection_id, &[])?))
            .await?;
        Ok(())
    }

    async fn register_schema(&self, connection_id: &str, schema: &Schema) -> Result<String> {
        let response = self
            .send(
                self.client
                    .patch(self.connection_url(connection_id, &["schema"])?)
                    .header("Prefer", "respond-async")
                    .json(schema),
            )
            .await?;

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Service {
                status: response.status(),
                code: "MissingLocation".to_string(),
                message: "schema registration response carried no Location header".to_string(),
            })?;
        let operation_id = operation_id_from_location(location)?;
        tracing::info!(connection_id, operation_id = %operation_id, "schema registration accepted");
        Ok(operation_id)
    }

    async fn get_operation(
        &self,
        connection_id: &str,
        operation_id: &str,
    ) -> Result<ConnectionOperation> {
        let url = self.connection_url(connection_id, &["operations", operation_id])?;
        self.send_json(self.client.get(url)).await
    }

    async fn get_schema(&self, connection_id: &str) -> Result<Schema> {
        let url = self.connection_url(connection_id, &["schema"])?;
        self.send_json(self.client.get(url)).await
    }

    async fn upsert_item(&self, connection_id: &str, item: &ExternalItem) -> Result<()> {
        let url = self.connection_url(connection_id, &["items", item.id.as_str()])?;
        self.send(self.client.put(url).json(item)).await?;
        Ok(())
    }

    async fn delete_item(&self, connection_id: &str, item_id: &str) -> Result<()> {
        let url = self.connection_url(connection_id, &["items", item_id])?;
        self.send(self.client.delete(url)).await?;
        Ok(())
    }
}

#[async_trait]
impl GroupDirectory for GraphClient {
    async fn list_groups(&self) -> Result<Vec<DirectoryGroup>> {
        let mut first = self.endpoint(&["groups"])?;
        first.set_query(Some(&format!("$select={}", GROUP_SELECT)));
        let groups: Vec<DirectoryGroup> = self.get_all_pages(first.into()).await?;
        tracing::info!(count = groups.len(), "fetched directory groups");
        Ok(groups)
    }
}
