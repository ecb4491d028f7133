use super::DocumentStore;
use crate::error::{ErrorCode, VendorError};
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use serde_json::{Map, Value};
use std::collections::HashMap;

type Item = HashMap<String, AttributeValue>;

/// Attributes owned by the table layout rather than by the document.
const RESERVED: &[&str] = &["PK", "SK", "entity_type", "doc_id"];

/// Single-table DynamoDB document store.
///
/// Every document is one item with `PK = SK = {COLLECTION}#{id}`, plus
/// `entity_type` and `doc_id` attributes; document fields are stored as
/// top-level attributes so equality queries can filter on them.
#[derive(Debug, Clone)]
pub struct DynamoStore {
    client: DynamoClient,
    table_name: String,
}

impl DynamoStore {
    pub fn new(client: DynamoClient, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

fn primary_key(collection: &str, id: &str) -> String {
    format!("{}#{}", collection.to_uppercase(), id)
}

pub(crate) fn to_attribute(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Array(items) => AttributeValue::L(items.iter().map(to_attribute).collect()),
        Value::Object(map) => AttributeValue::M(
            map.iter()
                .map(|(key, value)| (key.clone(), to_attribute(value)))
                .collect(),
        ),
    }
}

fn parse_number(n: &str) -> Value {
    if let Ok(int) = n.parse::<i64>() {
        return Value::from(int);
    }
    n.parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(n.to_string()))
}

pub(crate) fn from_attribute(attr: &AttributeValue) -> Value {
    match attr {
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => parse_number(n),
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::L(items) => Value::Array(items.iter().map(from_attribute).collect()),
        AttributeValue::M(map) => Value::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), from_attribute(value)))
                .collect(),
        ),
        AttributeValue::Ss(items) => Value::Array(items.iter().cloned().map(Value::String).collect()),
        AttributeValue::Ns(items) => Value::Array(items.iter().map(|n| parse_number(n)).collect()),
        other => {
            tracing::warn!("Unsupported attribute type in document: {:?}", other);
            Value::Null
        }
    }
}

fn item_to_document(item: &Item) -> Value {
    let fields: Map<String, Value> = item
        .iter()
        .filter(|(key, _)| !RESERVED.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), from_attribute(value)))
        .collect();
    Value::Object(fields)
}

fn document_to_item(collection: &str, id: &str, document: &Value) -> Result<Item, VendorError> {
    let fields = document.as_object().ok_or_else(|| {
        VendorError::new(ErrorCode::InvalidArgument, "Document must be a JSON object")
    })?;

    let pk = primary_key(collection, id);
    let mut item: Item = fields
        .iter()
        .filter(|(key, _)| !RESERVED.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), to_attribute(value)))
        .collect();
    item.insert("PK".to_string(), AttributeValue::S(pk.clone()));
    item.insert("SK".to_string(), AttributeValue::S(pk));
    item.insert("entity_type".to_string(), AttributeValue::S(collection.to_string()));
    item.insert("doc_id".to_string(), AttributeValue::S(id.to_string()));
    Ok(item)
}

impl DocumentStore for DynamoStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, VendorError> {
        let pk = primary_key(collection, id);

        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(pk.clone()))
            .key("SK", AttributeValue::S(pk))
            .send()
            .await
            .map_err(|e| VendorError::from_sdk("DynamoDB get_item", e))?;

        Ok(result.item().map(item_to_document))
    }

    async fn set(&self, collection: &str, id: &str, document: Value) -> Result<(), VendorError> {
        let item = document_to_item(collection, id, &document)?;

        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| VendorError::from_sdk("DynamoDB put_item", e))?;

        tracing::info!("Document saved: {}/{}", collection, id);
        Ok(())
    }

    async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<(String, Value)>, VendorError> {
        let mut documents = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let output = self
                .client
                .scan()
                .table_name(&self.table_name)
                .filter_expression("entity_type = :entity AND #field = :value")
                .expression_attribute_names("#field", field)
                .expression_attribute_values(":entity", AttributeValue::S(collection.to_string()))
                .expression_attribute_values(":value", AttributeValue::S(value.to_string()))
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| VendorError::from_sdk("DynamoDB scan", e))?;

            for item in output.items() {
                if let Some(id) = item.get("doc_id").and_then(|v| v.as_s().ok()) {
                    documents.push((id.clone(), item_to_document(item)));
                }
            }

            match output.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        tracing::info!(
            "Query {} where {} = {} returned {} documents",
            collection,
            field,
            value,
            documents.len()
        );
        Ok(documents)
    }
}
