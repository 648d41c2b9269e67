//! Record stores: the backend behind list and single-resource queries.
//!
//! A [`RecordStore`] hands out request-scoped [`StoreSession`]s; a session
//! stays open until the response payload has been composed and is then
//! closed explicitly.

pub mod memory;
pub mod postgres;

use crate::domain::entity::record::json_key_text;
use crate::domain::entity::{ColumnType, EntityDescriptor, Relationship};
use crate::domain::query::{ParamType, ParamValue, QueryPlan};
use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

/// One stored row as a column → JSON value map.
pub type Row = Map<String, JsonValue>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("malformed row from {table}: {reason}")]
    MalformedRow { table: String, reason: String },
    #[error("unknown table {0}")]
    UnknownTable(String),
}

/// A related row together with the owner key it was loaded for.
#[derive(Debug, Clone, PartialEq)]
pub struct RelatedRow {
    pub owner_key: JsonValue,
    pub row: Row,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn session(&self) -> Result<Box<dyn StoreSession>, StoreError>;

    /// Cheap liveness check used by `/health`.
    async fn ping(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait StoreSession: Send {
    /// Distinct base entities matching every filter of `plan`.
    async fn count(&mut self, plan: &QueryPlan) -> Result<u64, StoreError>;

    /// The plan's window of matching rows, ordered by primary key.
    async fn fetch_window(&mut self, plan: &QueryPlan) -> Result<Vec<Row>, StoreError>;

    /// Rows whose primary key equals `key`, one value per key column.
    async fn fetch_by_key(&mut self, entity: &EntityDescriptor, key: &[ParamValue]) -> Result<Vec<Row>, StoreError>;

    /// Rows of `target` related to any of `owner_keys` (values of the
    /// relationship's local column on the owning side).
    async fn fetch_related(
        &mut self,
        relationship: &Relationship,
        target: &EntityDescriptor,
        owner_keys: &[JsonValue],
    ) -> Result<Vec<RelatedRow>, StoreError>;

    async fn close(self: Box<Self>) -> Result<(), StoreError>;
}

/// Parameter type used to bind values of a stored column.
pub fn param_type(column: ColumnType) -> ParamType {
    match column {
        ColumnType::Integer => ParamType::Integer,
        ColumnType::Decimal => ParamType::Decimal,
        ColumnType::Text => ParamType::Text,
        ColumnType::Date => ParamType::Date,
        ColumnType::Boolean => ParamType::Boolean,
    }
}

/// Typed key value of a raw JSON column value, `None` when it cannot be bound.
pub fn key_value(column: ColumnType, raw: &JsonValue) -> Option<ParamValue> {
    match raw {
        JsonValue::Null => None,
        JsonValue::Bool(b) if column == ColumnType::Boolean => Some(ParamValue::Boolean(*b)),
        other => param_type(column).parse(&json_key_text(other)?),
    }
}

/// Same key compared as text, so `1` and `"1"` match.
pub fn same_key(a: &JsonValue, b: &JsonValue) -> bool {
    match (json_key_text(a), json_key_text(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_values_follow_column_type() {
        assert_eq!(key_value(ColumnType::Integer, &json!("42")), Some(ParamValue::Integer(42)));
        assert_eq!(key_value(ColumnType::Integer, &json!(42)), Some(ParamValue::Integer(42)));
        assert_eq!(key_value(ColumnType::Integer, &json!("x")), None);
        assert_eq!(key_value(ColumnType::Text, &json!(7)), Some(ParamValue::Text("7".into())));
        assert_eq!(key_value(ColumnType::Text, &JsonValue::Null), None);
    }

    #[test]
    fn keys_compare_as_text() {
        assert!(same_key(&json!(1), &json!("1")));
        assert!(!same_key(&json!(1), &json!(2)));
        assert!(!same_key(&JsonValue::Null, &JsonValue::Null));
    }
}
