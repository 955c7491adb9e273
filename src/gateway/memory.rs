//! In-memory gateway with fault injection.
//!
//! Tables are vectors of JSON records validated against the same catalog
//! as [`PgGateway`](super::PgGateway). Column defaults, NOT NULL and unique
//! constraints from the catalog are enforced so that services observe the
//! same failures they would against Postgres. `fail_table` makes every
//! operation on a table return [`GatewayError::Unavailable`].

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use serde_json::Value;
use uuid::Uuid;

use super::catalog::{self, ColumnDefault, RelationKind, TableDef};
use super::{Direction, Embed, Filter, Gateway, GatewayError, Query, Record};

type Tables = HashMap<String, Vec<Record>>;

/// Wildcard accepted by [`InMemoryGateway::fail_table`].
pub const ALL_TABLES: &str = "*";

#[derive(Debug, Default)]
pub struct InMemoryGateway {
    tables: Mutex<Tables>,
    failing: Mutex<HashSet<String>>,
    calls: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn now_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

fn field<'a>(row: &'a Record, column: &str) -> &'a Value {
    row.get(column).unwrap_or(&Value::Null)
}

fn as_timestamp(value: &Value) -> Option<DateTime<FixedOffset>> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::String(x), Value::String(y)) if x != y => {
            matches!((as_timestamp(a), as_timestamp(b)), (Some(p), Some(q)) if p == q)
        }
        _ => a == b,
    }
}

/// Postgres-like ordering: NULL sorts after every value.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => match (as_timestamp(a), as_timestamp(b)) {
            (Some(p), Some(q)) => p.cmp(&q),
            _ => x.cmp(y),
        },
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

fn matches(row: &Record, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| match filter {
        Filter::Eq(column, Value::Null) => field(row, column).is_null(),
        Filter::Eq(column, value) => values_equal(field(row, column), value),
        Filter::In(column, values) => values.iter().any(|v| values_equal(field(row, column), v)),
    })
}

fn not_null_violation(table: &str, column: &str) -> GatewayError {
    GatewayError::ConstraintViolation(format!(
        "null value in column \"{column}\" of relation \"{table}\" violates not-null constraint"
    ))
}

/// Complete a row with catalog defaults and check NOT NULL columns.
fn materialize(def: &TableDef, mut row: Record) -> Result<Record, GatewayError> {
    for column in def.columns {
        if !row.contains_key(column.name) {
            let value = match column.default {
                ColumnDefault::None => Value::Null,
                ColumnDefault::GeneratedId => Value::String(Uuid::new_v4().to_string()),
                ColumnDefault::Now => Value::String(now_string()),
                ColumnDefault::Bool(b) => Value::Bool(b),
                ColumnDefault::Text(t) => Value::String(t.to_string()),
            };
            row.insert(column.name.to_string(), value);
        }
        if !column.nullable && field(&row, column.name).is_null() {
            return Err(not_null_violation(def.name, column.name));
        }
    }
    Ok(row)
}

fn check_not_null(def: &TableDef, row: &Record) -> Result<(), GatewayError> {
    match def
        .columns
        .iter()
        .find(|c| !c.nullable && field(row, c.name).is_null())
    {
        Some(column) => Err(not_null_violation(def.name, column.name)),
        None => Ok(()),
    }
}

fn same_key(a: &Record, b: &Record, columns: &[&str]) -> bool {
    columns.iter().all(|c| {
        let (x, y) = (field(a, c), field(b, c));
        !x.is_null() && !y.is_null() && values_equal(x, y)
    })
}

fn check_unique(def: &TableDef, existing: &[Record], row: &Record) -> Result<(), GatewayError> {
    for key in def.unique {
        if existing.iter().any(|other| same_key(other, row, key)) {
            return Err(GatewayError::UniqueViolation(format!(
                "duplicate key value violates unique constraint on {}({})",
                def.name,
                key.join(", ")
            )));
        }
    }
    Ok(())
}

fn project(
    tables: &Tables,
    def: &TableDef,
    row: &Record,
    columns: &[String],
    embeds: &[Embed],
) -> Result<Record, GatewayError> {
    let mut out = if columns.is_empty() {
        row.clone()
    } else {
        columns
            .iter()
            .map(|c| (c.clone(), field(row, c).clone()))
            .collect()
    };
    for embed in embeds {
        let relation = def.require_relation(&embed.relation)?;
        let target = catalog::table(relation.table)?;
        let rows = tables.get(target.name).map(Vec::as_slice).unwrap_or(&[]);
        let value = match relation.kind {
            RelationKind::BelongsTo { column } => {
                let key = field(row, column);
                match rows.iter().find(|r| !key.is_null() && values_equal(field(r, "id"), key)) {
                    Some(related) => Value::Object(project(
                        tables,
                        target,
                        related,
                        &embed.columns,
                        &embed.embeds,
                    )?),
                    None => Value::Null,
                }
            }
            RelationKind::HasMany { foreign_column } => {
                let id = field(row, "id");
                let mut related: Vec<&Record> = rows
                    .iter()
                    .filter(|r| values_equal(field(r, foreign_column), id))
                    .collect();
                related.sort_by(|a, b| {
                    compare_values(field(a, "created_at"), field(b, "created_at"))
                        .then_with(|| compare_values(field(a, "id"), field(b, "id")))
                });
                let items = related
                    .into_iter()
                    .map(|r| project(tables, target, r, &embed.columns, &embed.embeds).map(Value::Object))
                    .collect::<Result<Vec<_>, _>>()?;
                Value::Array(items)
            }
        };
        out.insert(embed.relation.clone(), value);
    }
    Ok(out)
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row directly, applying defaults and constraints.
    pub fn seed(&self, table: &str, row: Value) -> Result<Record, GatewayError> {
        let def = catalog::table(table)?;
        let Value::Object(record) = row else {
            return Err(GatewayError::Rejected(format!("seed row for {table} must be an object")));
        };
        catalog::validate_columns(def, record.keys().map(String::as_str))?;
        let mut tables = lock(&self.tables);
        let rows = tables.entry(table.to_string()).or_default();
        let stored = materialize(def, record)?;
        check_unique(def, rows, &stored)?;
        rows.push(stored.clone());
        Ok(stored)
    }

    /// Make every operation touching `table` fail. [`ALL_TABLES`] fails everything.
    pub fn fail_table(&self, table: &str) {
        lock(&self.failing).insert(table.to_string());
    }

    pub fn heal_table(&self, table: &str) {
        lock(&self.failing).remove(table);
    }

    /// Number of gateway operations issued so far.
    pub fn calls(&self) -> usize {
        self.calls.load(AtomicOrdering::SeqCst)
    }

    /// Snapshot of a table's rows in insertion order.
    pub fn rows(&self, table: &str) -> Vec<Record> {
        lock(&self.tables).get(table).cloned().unwrap_or_default()
    }

    fn enter(&self, table: &str) -> Result<(), GatewayError> {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
        let failing = lock(&self.failing);
        if failing.contains(table) || failing.contains(ALL_TABLES) {
            return Err(GatewayError::Unavailable(format!("{table} is unavailable")));
        }
        Ok(())
    }

    fn insert_rows(&self, def: &TableDef, rows: Vec<Record>) -> Result<Vec<Record>, GatewayError> {
        let mut tables = lock(&self.tables);
        let existing = tables.entry(def.name.to_string()).or_default();
        let mut staged: Vec<Record> = Vec::with_capacity(rows.len());
        for row in rows {
            let stored = materialize(def, row)?;
            check_unique(def, existing, &stored)?;
            check_unique(def, &staged, &stored)?;
            staged.push(stored);
        }
        existing.extend(staged.iter().cloned());
        Ok(staged)
    }
}

#[async_trait]
impl Gateway for InMemoryGateway {
    async fn select(&self, query: &Query) -> Result<Vec<Record>, GatewayError> {
        self.enter(&query.table)?;
        let def = catalog::validate_query(query)?;
        let tables = lock(&self.tables);
        let mut rows: Vec<&Record> = tables
            .get(def.name)
            .map(|rows| rows.iter().filter(|r| matches(r, &query.filters)).collect())
            .unwrap_or_default();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = compare_values(field(a, &order.column), field(b, &order.column))
                    .then_with(|| compare_values(field(a, "id"), field(b, "id")));
                match order.direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }

        rows.into_iter()
            .map(|row| project(&tables, def, row, &query.columns, &query.embeds))
            .collect()
    }

    async fn count(&self, query: &Query) -> Result<i64, GatewayError> {
        self.enter(&query.table)?;
        let def = catalog::validate_query(query)?;
        let tables = lock(&self.tables);
        let count = tables
            .get(def.name)
            .map(|rows| rows.iter().filter(|r| matches(r, &query.filters)).count())
            .unwrap_or(0);
        Ok(count as i64)
    }

    async fn insert(&self, table: &str, rows: Vec<Record>) -> Result<Vec<Record>, GatewayError> {
        self.enter(table)?;
        let def = catalog::table(table)?;
        for row in &rows {
            catalog::validate_columns(def, row.keys().map(String::as_str))?;
        }
        self.insert_rows(def, rows)
    }

    async fn upsert(
        &self,
        table: &str,
        row: Record,
        on_conflict: &[&str],
    ) -> Result<Record, GatewayError> {
        self.enter(table)?;
        let def = catalog::table(table)?;
        catalog::validate_columns(def, on_conflict.iter().copied())?;
        catalog::validate_columns(def, row.keys().map(String::as_str))?;

        {
            let mut tables = lock(&self.tables);
            let existing = tables.entry(def.name.to_string()).or_default();
            if let Some(current) = existing.iter_mut().find(|r| same_key(r, &row, on_conflict)) {
                let mut merged = current.clone();
                for (key, value) in row {
                    if !on_conflict.contains(&key.as_str()) {
                        merged.insert(key, value);
                    }
                }
                check_not_null(def, &merged)?;
                *current = merged.clone();
                return Ok(merged);
            }
        }

        self.insert_rows(def, vec![row])?
            .pop()
            .ok_or_else(|| GatewayError::Backend(format!("upsert into {table} stored no row")))
    }

    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: Record,
    ) -> Result<Vec<Record>, GatewayError> {
        self.enter(table)?;
        let def = catalog::table(table)?;
        if filters.is_empty() {
            return Err(GatewayError::Rejected(format!("unfiltered update of {table}")));
        }
        catalog::validate_columns(def, filters.iter().map(Filter::column))?;
        catalog::validate_columns(def, patch.keys().map(String::as_str))?;

        let mut tables = lock(&self.tables);
        let Some(rows) = tables.get_mut(def.name) else {
            return Ok(Vec::new());
        };
        let mut updated = Vec::new();
        for row in rows.iter_mut().filter(|r| matches(r, filters)) {
            let mut next = row.clone();
            next.extend(patch.clone());
            check_not_null(def, &next)?;
            *row = next.clone();
            updated.push(next);
        }
        Ok(updated)
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<u64, GatewayError> {
        self.enter(table)?;
        let def = catalog::table(table)?;
        if filters.is_empty() {
            return Err(GatewayError::Rejected(format!("unfiltered delete of {table}")));
        }
        catalog::validate_columns(def, filters.iter().map(Filter::column))?;

        let mut tables = lock(&self.tables);
        let Some(rows) = tables.get_mut(def.name) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|r| !matches(r, filters));
        Ok((before - rows.len()) as u64)
    }

    async fn ping(&self) -> Result<(), GatewayError> {
        self.enter(ALL_TABLES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{eq, Embed};
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[tokio::test]
    async fn seed_applies_defaults() {
        let gw = InMemoryGateway::new();
        let job = gw
            .seed("jobs", json!({ "title": "Logo", "description": "Design a logo" }))
            .unwrap();
        assert_eq!(job["status"], "open");
        assert_eq!(job["is_verified"], false);
        assert!(Uuid::parse_str(job["id"].as_str().unwrap()).is_ok());
        assert!(job["created_at"].is_string());
    }

    #[tokio::test]
    async fn select_filters_orders_and_limits() {
        let gw = InMemoryGateway::new();
        let payee = Uuid::new_v4();
        for (i, amount) in [100, 200, 300].into_iter().enumerate() {
            gw.seed(
                "payments",
                json!({
                    "payee_id": payee,
                    "amount": amount,
                    "created_at": format!("2026-01-0{}T00:00:00+00:00", i + 1),
                }),
            )
            .unwrap();
        }
        gw.seed("payments", json!({ "payee_id": Uuid::new_v4(), "amount": 999 }))
            .unwrap();

        let q = Query::table("payments")
            .select(&["amount"])
            .eq("payee_id", payee)
            .order_by("created_at", Direction::Desc)
            .limit(2);
        let rows = gw.select(&q).await.unwrap();
        let amounts: Vec<i64> = rows.iter().map(|r| r["amount"].as_i64().unwrap()).collect();
        assert_eq!(amounts, vec![300, 200]);
        assert_eq!(rows[0].len(), 1);
    }

    #[tokio::test]
    async fn timestamps_order_by_instant_not_text() {
        let gw = InMemoryGateway::new();
        let payee = Uuid::new_v4();
        gw.seed("payments", json!({ "payee_id": payee, "amount": 1, "created_at": "2026-01-01T00:00:00.5+00:00" }))
            .unwrap();
        gw.seed("payments", json!({ "payee_id": payee, "amount": 2, "created_at": "2026-01-01T00:00:00+00:00" }))
            .unwrap();
        let q = Query::table("payments").order_by("created_at", Direction::Desc);
        let rows = gw.select(&q).await.unwrap();
        assert_eq!(rows[0]["amount"], 1);
    }

    #[tokio::test]
    async fn embeds_resolve_both_directions() {
        let gw = InMemoryGateway::new();
        let job = gw
            .seed("jobs", json!({ "title": "Landing page", "description": "d", "company_name": "Acme" }))
            .unwrap();
        let applicant = Uuid::new_v4();
        gw.seed("applications", json!({ "job_id": job["id"], "applicant_id": applicant }))
            .unwrap();

        let apps = gw
            .select(&Query::table("applications").embed(Embed::new("jobs", &["title", "company_name"])))
            .await
            .unwrap();
        assert_eq!(apps[0]["jobs"], json!({ "title": "Landing page", "company_name": "Acme" }));

        let jobs = gw
            .select(&Query::table("jobs").embed(Embed::new("applications", &["applicant_id"])))
            .await
            .unwrap();
        assert_eq!(jobs[0]["applications"], json!([{ "applicant_id": applicant.to_string() }]));
    }

    #[tokio::test]
    async fn insert_batch_is_all_or_nothing() {
        let gw = InMemoryGateway::new();
        let path = gw.seed("learning_paths", json!({ "title": "Rust" })).unwrap();
        let rows = vec![
            record(json!({ "learning_path_id": path["id"], "title": "One", "order_index": 1 })),
            record(json!({ "learning_path_id": path["id"], "title": null, "order_index": 2 })),
        ];
        let err = gw.insert("lessons", rows).await.unwrap_err();
        assert!(matches!(err, GatewayError::ConstraintViolation(_)));
        assert!(gw.rows("lessons").is_empty());
    }

    #[tokio::test]
    async fn unique_constraints_are_enforced() {
        let gw = InMemoryGateway::new();
        let row = json!({ "learning_path_id": Uuid::nil(), "user_id": Uuid::nil() });
        gw.insert("course_likes", vec![record(row.clone())]).await.unwrap();
        let err = gw.insert("course_likes", vec![record(row)]).await.unwrap_err();
        assert!(matches!(err, GatewayError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn upsert_merges_on_conflict_columns() {
        let gw = InMemoryGateway::new();
        let user = Uuid::new_v4();
        let base = json!({ "learning_path_id": Uuid::nil(), "user_id": user, "rating": 3 });
        let first = gw
            .upsert("course_reviews", record(base), &["learning_path_id", "user_id"])
            .await
            .unwrap();
        let second = gw
            .upsert(
                "course_reviews",
                record(json!({ "learning_path_id": Uuid::nil(), "user_id": user, "rating": 5 })),
                &["learning_path_id", "user_id"],
            )
            .await
            .unwrap();
        assert_eq!(first["id"], second["id"]);
        assert_eq!(second["rating"], 5);
        assert_eq!(gw.rows("course_reviews").len(), 1);
    }

    #[tokio::test]
    async fn conditional_update_and_delete() {
        let gw = InMemoryGateway::new();
        let app = gw
            .seed("applications", json!({ "job_id": Uuid::nil(), "applicant_id": Uuid::nil() }))
            .unwrap();
        let patch = record(json!({ "status": "accepted" }));
        let filters = [eq("id", &app["id"]), eq("status", "pending")];
        assert_eq!(gw.update("applications", &filters, patch.clone()).await.unwrap().len(), 1);
        assert!(gw.update("applications", &filters, patch).await.unwrap().is_empty());

        assert_eq!(gw.delete("applications", &[eq("id", &app["id"])]).await.unwrap(), 1);
        assert!(gw.rows("applications").is_empty());
    }

    #[tokio::test]
    async fn failing_tables_and_call_counter() {
        let gw = InMemoryGateway::new();
        gw.fail_table("payments");
        let err = gw.select(&Query::table("payments")).await.unwrap_err();
        assert!(matches!(err, GatewayError::Unavailable(_)));
        assert!(gw.select(&Query::table("profiles")).await.is_ok());
        assert_eq!(gw.calls(), 2);

        gw.heal_table("payments");
        assert!(gw.count(&Query::table("payments")).await.is_ok());
    }
}
