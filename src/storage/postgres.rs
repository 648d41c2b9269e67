//! PostgreSQL record store.
//!
//! Rows are read back as `row_to_json(alias.*)` so every table shares one
//! decoding path. Identifiers pushed into SQL come from validated entity
//! descriptors; client values are always bound.

use super::{RecordStore, RelatedRow, Row, StoreError, StoreSession};
use crate::domain::entity::{Catalog, EntityDescriptor, Relationship};
use crate::domain::query::plan::like_pattern;
use crate::domain::query::{Comparison, Filter, ParamValue, QueryPlan};
use crate::domain::entity::record::json_key_text;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row as _};
use std::collections::{HashMap, HashSet};

const BASE: &str = "base";
const OUTER: &str = "t";

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Catalog tables and columns missing from the current schema, as
    /// `table` or `table.column`.
    pub async fn missing_schema_objects(&self, catalog: &Catalog) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query(
            "SELECT table_name::text AS table_name, column_name::text AS column_name
             FROM information_schema.columns WHERE table_schema = current_schema()",
        )
        .fetch_all(&self.pool)
        .await?;
        let mut schema: HashMap<String, HashSet<String>> = HashMap::new();
        for row in rows {
            let table: String = row.try_get("table_name")?;
            let column: String = row.try_get("column_name")?;
            schema.entry(table).or_default().insert(column);
        }

        let mut expected: Vec<(String, Vec<String>)> = Vec::new();
        for d in catalog.descriptors() {
            expected.push((
                d.table().to_string(),
                d.columns().iter().map(|(c, _)| c.clone()).collect(),
            ));
            for rel in d.relationships() {
                if let Some(assoc) = &rel.through {
                    expected.push((
                        assoc.table.clone(),
                        vec![assoc.local_column.clone(), assoc.remote_column.clone()],
                    ));
                }
            }
        }

        let mut missing = Vec::new();
        for (table, columns) in expected {
            match schema.get(&table) {
                None => missing.push(table),
                Some(present) => missing.extend(
                    columns
                        .into_iter()
                        .filter(|c| !present.contains(c))
                        .map(|c| format!("{}.{}", table, c)),
                ),
            }
        }
        missing.sort();
        missing.dedup();
        Ok(missing)
    }
}

#[async_trait]
impl RecordStore for PostgresStore {
    async fn session(&self) -> Result<Box<dyn StoreSession>, StoreError> {
        let conn = self.pool.acquire().await?;
        Ok(Box::new(PostgresSession { conn }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// One pooled connection, held for the lifetime of a request.
pub struct PostgresSession {
    conn: PoolConnection<Postgres>,
}

fn columns(alias: &str, cols: &[String]) -> String {
    cols.iter()
        .map(|c| format!("{}.{}", alias, c))
        .collect::<Vec<_>>()
        .join(", ")
}

fn push_value(qb: &mut QueryBuilder<'_, Postgres>, value: &ParamValue) {
    match value {
        ParamValue::Integer(i) => qb.push_bind(*i),
        ParamValue::Decimal(d) => qb.push_bind(*d),
        ParamValue::Text(s) => qb.push_bind(s.clone()),
        ParamValue::Date(d) => qb.push_bind(*d),
        ParamValue::Boolean(b) => qb.push_bind(*b),
    };
}

/// One independent join chain per filter; aliases never collide across
/// parameters.
fn push_joins(qb: &mut QueryBuilder<'_, Postgres>, filters: &[Filter]) {
    for filter in filters {
        let mut previous = BASE.to_string();
        for step in &filter.path.steps {
            let rel = &step.relationship;
            match (&rel.through, &step.through_alias) {
                (Some(assoc), Some(through)) => {
                    qb.push(format!(
                        " JOIN {} AS {} ON {}.{} = {}.{}",
                        assoc.table, through, through, assoc.local_column, previous, rel.local_column
                    ));
                    qb.push(format!(
                        " JOIN {} AS {} ON {}.{} = {}.{}",
                        step.table, step.alias, step.alias, rel.remote_column, through, assoc.remote_column
                    ));
                }
                _ => {
                    qb.push(format!(
                        " JOIN {} AS {} ON {}.{} = {}.{}",
                        step.table, step.alias, step.alias, rel.remote_column, previous, rel.local_column
                    ));
                }
            }
            previous = step.alias.clone();
        }
    }
}

fn push_where(qb: &mut QueryBuilder<'_, Postgres>, filters: &[Filter]) {
    for (i, filter) in filters.iter().enumerate() {
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        qb.push(format!(
            "{}.{} {} ",
            filter.path.leaf_alias(BASE),
            filter.path.column,
            filter.comparison.sql_operator()
        ));
        match filter.comparison {
            Comparison::Contains => {
                qb.push_bind(like_pattern(&filter.value.to_string()));
                qb.push(" ESCAPE '\\'");
            }
            _ => push_value(qb, &filter.value),
        }
    }
}

/// `FROM table AS base JOIN ... WHERE ...`
fn push_matching(qb: &mut QueryBuilder<'_, Postgres>, plan: &QueryPlan) {
    qb.push(format!(" FROM {} AS {}", plan.entity.table(), BASE));
    push_joins(qb, &plan.filters);
    push_where(qb, &plan.filters);
}

fn decode_record(row: &PgRow, table: &str) -> Result<Row, StoreError> {
    let record: JsonValue = row.try_get("record")?;
    match record {
        JsonValue::Object(map) => Ok(map),
        other => Err(StoreError::MalformedRow {
            table: table.to_string(),
            reason: format!("expected an object, got {}", other),
        }),
    }
}

#[async_trait]
impl StoreSession for PostgresSession {
    async fn count(&mut self, plan: &QueryPlan) -> Result<u64, StoreError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) AS total FROM (SELECT DISTINCT ");
        qb.push(columns(BASE, &plan.order_by));
        push_matching(&mut qb, plan);
        qb.push(") AS matched");
        tracing::debug!(sql = qb.sql(), "count");

        let row = qb.build().fetch_one(&mut *self.conn).await?;
        let total: i64 = row.try_get("total")?;
        Ok(total.max(0) as u64)
    }

    async fn fetch_window(&mut self, plan: &QueryPlan) -> Result<Vec<Row>, StoreError> {
        let table = plan.entity.table();
        let mut qb: QueryBuilder<Postgres>;
        let order_alias;
        if plan.has_joins() {
            // Joins can fan out; select distinct base keys first.
            order_alias = OUTER;
            qb = QueryBuilder::new(format!(
                "SELECT row_to_json({o}.*) AS record FROM {table} AS {o} WHERE ({outer_pk}) IN (SELECT {base_pk}",
                o = OUTER,
                table = table,
                outer_pk = columns(OUTER, &plan.order_by),
                base_pk = columns(BASE, &plan.order_by),
            ));
            push_matching(&mut qb, plan);
            qb.push(")");
        } else {
            order_alias = BASE;
            qb = QueryBuilder::new(format!("SELECT row_to_json({}.*) AS record", BASE));
            push_matching(&mut qb, plan);
        }
        qb.push(format!(" ORDER BY {}", columns(order_alias, &plan.order_by)));
        qb.push(" LIMIT ");
        qb.push_bind(plan.window.limit as i64);
        qb.push(" OFFSET ");
        qb.push_bind(plan.window.offset as i64);
        tracing::debug!(sql = qb.sql(), "fetch window");

        let rows = qb.build().fetch_all(&mut *self.conn).await?;
        rows.iter().map(|r| decode_record(r, table)).collect()
    }

    async fn fetch_by_key(&mut self, entity: &EntityDescriptor, key: &[ParamValue]) -> Result<Vec<Row>, StoreError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT row_to_json({o}.*) AS record FROM {} AS {o}",
            entity.table(),
            o = OUTER
        ));
        for (i, (column, value)) in entity.primary_key().iter().zip(key).enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            qb.push(format!("{}.{} = ", OUTER, column));
            push_value(&mut qb, value);
        }
        // Two rows are enough to detect an ambiguous key.
        qb.push(" LIMIT 2");

        let rows = qb.build().fetch_all(&mut *self.conn).await?;
        rows.iter().map(|r| decode_record(r, entity.table())).collect()
    }

    async fn fetch_related(
        &mut self,
        relationship: &Relationship,
        target: &EntityDescriptor,
        owner_keys: &[JsonValue],
    ) -> Result<Vec<RelatedRow>, StoreError> {
        let keys: Vec<String> = owner_keys.iter().filter_map(json_key_text).collect();
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let sql = match &relationship.through {
            Some(assoc) => format!(
                "SELECT to_json(a.{local}) AS owner_key, row_to_json({o}.*) AS record
                 FROM {assoc} AS a JOIN {target} AS {o} ON {o}.{remote} = a.{assoc_remote}
                 WHERE a.{local}::text = ANY($1) ORDER BY {order}",
                local = assoc.local_column,
                assoc = assoc.table,
                target = target.table(),
                remote = relationship.remote_column,
                assoc_remote = assoc.remote_column,
                o = OUTER,
                order = columns(OUTER, target.primary_key()),
            ),
            None => format!(
                "SELECT to_json({o}.{remote}) AS owner_key, row_to_json({o}.*) AS record
                 FROM {target} AS {o} WHERE {o}.{remote}::text = ANY($1) ORDER BY {order}",
                target = target.table(),
                remote = relationship.remote_column,
                o = OUTER,
                order = columns(OUTER, target.primary_key()),
            ),
        };
        let rows = sqlx::query(&sql).bind(keys).fetch_all(&mut *self.conn).await?;
        let mut related = Vec::with_capacity(rows.len());
        for row in &rows {
            let owner_key: JsonValue = row.try_get("owner_key")?;
            related.push(RelatedRow {
                owner_key,
                row: decode_record(row, target.table())?,
            });
        }
        Ok(related)
    }

    async fn close(self: Box<Self>) -> Result<(), StoreError> {
        // Dropping the connection returns it to the pool.
        drop(self.conn);
        Ok(())
    }
}
