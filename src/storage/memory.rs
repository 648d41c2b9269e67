//! In-memory record store.
//!
//! Evaluates query plans with the same semantics as the SQL store: each
//! filter follows its own relationship chain and matches when any row at the
//! end of the chain satisfies it.

use super::{key_value, same_key, RecordStore, RelatedRow, Row, StoreError, StoreSession};
use crate::domain::entity::record::json_key_text;
use crate::domain::entity::{ColumnType, EntityDescriptor, Relationship};
use crate::domain::query::{Comparison, Filter, ParamValue, QueryPlan};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<HashMap<String, Vec<Row>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding `rows` in each table. Non-object rows are rejected.
    pub fn from_tables<I, R>(tables: I) -> Result<Self, StoreError>
    where
        I: IntoIterator<Item = (String, R)>,
        R: IntoIterator<Item = JsonValue>,
    {
        let mut out: HashMap<String, Vec<Row>> = HashMap::new();
        for (table, rows) in tables {
            let entry = out.entry(table.clone()).or_default();
            for row in rows {
                match row {
                    JsonValue::Object(map) => entry.push(map),
                    other => {
                        return Err(StoreError::MalformedRow {
                            table,
                            reason: format!("expected an object, got {}", other),
                        })
                    }
                }
            }
        }
        Ok(Self {
            tables: Arc::new(out),
        })
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn session(&self) -> Result<Box<dyn StoreSession>, StoreError> {
        Ok(Box::new(MemorySession {
            tables: self.tables.clone(),
        }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

pub struct MemorySession {
    tables: Arc<HashMap<String, Vec<Row>>>,
}

fn cell<'a>(row: &'a Row, column: &str) -> &'a JsonValue {
    row.get(column).unwrap_or(&JsonValue::Null)
}

fn compare(raw: &JsonValue, column_type: ColumnType, comparison: Comparison, value: &ParamValue) -> bool {
    if comparison == Comparison::Contains {
        let (Some(haystack), Some(needle)) = (json_key_text(raw), value.as_text()) else {
            return false;
        };
        return haystack.to_lowercase().contains(&needle.to_lowercase());
    }
    let Some(stored) = key_value(column_type, raw) else {
        return false;
    };
    let Some(ordering) = stored.partial_cmp(value) else {
        return false;
    };
    match comparison {
        Comparison::Equal => ordering == Ordering::Equal,
        Comparison::Less => ordering == Ordering::Less,
        Comparison::LessOrEqual => ordering != Ordering::Greater,
        Comparison::Greater => ordering == Ordering::Greater,
        Comparison::GreaterOrEqual => ordering != Ordering::Less,
        Comparison::Contains => false,
    }
}

/// Ascending by every key column, in declaration order.
fn sort_by_key(rows: &mut [Row], entity: &EntityDescriptor) {
    let keys: Vec<(String, ColumnType)> = entity
        .primary_key()
        .iter()
        .map(|k| (k.clone(), entity.column(k).unwrap_or(ColumnType::Text)))
        .collect();
    rows.sort_by(|a, b| {
        for (column, ty) in &keys {
            let ord = match (key_value(*ty, cell(a, column)), key_value(*ty, cell(b, column))) {
                (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (None, None) => Ordering::Equal,
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

impl MemorySession {
    fn rows(&self, table: &str) -> &[Row] {
        self.tables.get(table).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Target rows linked to the owner-side value `local`.
    fn follow<'a>(&'a self, rel: &Relationship, target_table: &str, local: &JsonValue) -> Vec<&'a Row> {
        match &rel.through {
            Some(assoc) => self
                .rows(&assoc.table)
                .iter()
                .filter(|a| same_key(cell(a, &assoc.local_column), local))
                .flat_map(|a| {
                    self.rows(target_table)
                        .iter()
                        .filter(move |t| same_key(cell(t, &rel.remote_column), cell(a, &assoc.remote_column)))
                })
                .collect(),
            None => self
                .rows(target_table)
                .iter()
                .filter(|t| same_key(cell(t, &rel.remote_column), local))
                .collect(),
        }
    }

    fn matches(&self, row: &Row, filter: &Filter) -> bool {
        let mut frontier: Vec<&Row> = vec![row];
        for step in &filter.path.steps {
            frontier = frontier
                .into_iter()
                .flat_map(|r| self.follow(&step.relationship, &step.table, cell(r, &step.relationship.local_column)))
                .collect();
        }
        frontier.iter().any(|r| {
            compare(
                cell(r, &filter.path.column),
                filter.path.column_type,
                filter.comparison,
                &filter.value,
            )
        })
    }

    fn matching(&self, plan: &QueryPlan) -> Vec<Row> {
        let mut rows: Vec<Row> = self
            .rows(plan.entity.table())
            .iter()
            .filter(|row| plan.filters.iter().all(|f| self.matches(row, f)))
            .cloned()
            .collect();
        sort_by_key(&mut rows, &plan.entity);
        rows
    }
}

#[async_trait]
impl StoreSession for MemorySession {
    async fn count(&mut self, plan: &QueryPlan) -> Result<u64, StoreError> {
        Ok(self.matching(plan).len() as u64)
    }

    async fn fetch_window(&mut self, plan: &QueryPlan) -> Result<Vec<Row>, StoreError> {
        Ok(self
            .matching(plan)
            .into_iter()
            .skip(plan.window.offset as usize)
            .take(plan.window.limit as usize)
            .collect())
    }

    async fn fetch_by_key(&mut self, entity: &EntityDescriptor, key: &[ParamValue]) -> Result<Vec<Row>, StoreError> {
        Ok(self
            .rows(entity.table())
            .iter()
            .filter(|row| {
                entity.primary_key().iter().zip(key).all(|(column, value)| {
                    let ty = entity.column(column).unwrap_or(ColumnType::Text);
                    compare(cell(row, column), ty, Comparison::Equal, value)
                })
            })
            .cloned()
            .collect())
    }

    async fn fetch_related(
        &mut self,
        relationship: &Relationship,
        target: &EntityDescriptor,
        owner_keys: &[JsonValue],
    ) -> Result<Vec<RelatedRow>, StoreError> {
        let mut related = Vec::new();
        for key in owner_keys {
            let mut rows: Vec<Row> = self
                .follow(relationship, target.table(), key)
                .into_iter()
                .cloned()
                .collect();
            sort_by_key(&mut rows, target);
            related.extend(rows.into_iter().map(|row| RelatedRow {
                owner_key: key.clone(),
                row,
            }));
        }
        Ok(related)
    }

    async fn close(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
