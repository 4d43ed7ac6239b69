// groupsconnector/src/graph/schema.rs
use tokio::time::sleep;

use super::IndexClient;
use super::models::{OperationStatus, Property, PropertyType, Schema};
use crate::config::SchemaPollConfig;
use crate::errors::{AppError, Result};

const EXTERNAL_ITEM_BASE_TYPE: &str = "microsoft.graph.externalItem";

fn string_property(name: &str, queryable: bool, searchable: bool) -> Property {
    Property {
        name: name.to_string(),
        property_type: PropertyType::String,
        is_queryable: queryable,
        is_searchable: searchable,
        is_retrievable: true,
    }
}

/// Searchable fields of a group item.
pub fn groups_schema() -> Schema {
    Schema {
        base_type: EXTERNAL_ITEM_BASE_TYPE.to_string(),
        properties: vec![
            string_property("id", true, false),
            string_property("displayName", true, true),
            string_property("description", false, true),
        ],
    }
}

/// Registers `schema` and polls the returned operation until it settles.
///
/// Returns the number of status checks it took. Gives up with
/// `AppError::SchemaTimeout` after `poll.max_attempts` checks.
pub async fn register_schema_and_wait<C>(
    client: &C,
    connection_id: &str,
    schema: &Schema,
    poll: SchemaPollConfig,
) -> Result<u32>
where
    C: IndexClient + ?Sized,
{
    let operation_id = client.register_schema(connection_id, schema).await?;

    for attempt in 1..=poll.max_attempts {
        let operation = client.get_operation(connection_id, &operation_id).await?;
        match operation.status {
            OperationStatus::Completed => {
                tracing::info!(connection_id, operation_id = %operation_id, attempt, "schema registration completed");
                return Ok(attempt);
            }
            OperationStatus::Failed => {
                let error = operation.error.unwrap_or_default();
                tracing::error!(
                    connection_id,
                    operation_id = %operation_id,
                    code = %error.code,
                    message = %error.message,
                    "schema registration failed"
                );
                return Err(AppError::SchemaRegistration {
                    code: error.code,
                    message: error.message,
                });
            }
            status => {
                tracing::debug!(connection_id, attempt, ?status, "schema registration still running");
                if attempt < poll.max_attempts {
                    sleep(poll.interval).await;
                }
            }
        }
    }

    Err(AppError::SchemaTimeout {
        attempts: poll.max_attempts,
    })
}
