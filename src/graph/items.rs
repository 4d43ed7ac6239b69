// groupsconnector/src/graph/items.rs
use serde_json::{Map, Value};

use super::models::{Acl, ContentType, ExternalItem, ItemContent};
use crate::sync::SourceRecord;

const IDENTITY_SOURCE: &str = "azureActiveDirectory";

fn optional_text(value: &Option<String>) -> Value {
    match value {
        Some(text) => Value::String(text.clone()),
        None => Value::Null,
    }
}

/// Builds the index item for a group. Only members of the group itself may see it.
pub fn item_for_record(record: &SourceRecord) -> ExternalItem {
    let mut properties = Map::new();
    properties.insert("id".to_string(), Value::String(record.id.clone()));
    properties.insert("displayName".to_string(), optional_text(&record.display_name));
    properties.insert("description".to_string(), optional_text(&record.description));

    ExternalItem {
        id: record.id.clone(),
        acl: vec![Acl {
            acl_type: "group".to_string(),
            value: record.id.clone(),
            access_type: "grant".to_string(),
            identity_source: IDENTITY_SOURCE.to_string(),
        }],
        properties,
        content: ItemContent {
            content_type: ContentType::Text,
            value: record.description.clone().unwrap_or_default(),
        },
    }
}
