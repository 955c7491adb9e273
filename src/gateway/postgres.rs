//! PostgreSQL gateway: builds parameterised SQL from catalog-checked queries.
//!
//! Rows come back as `jsonb` objects built by Postgres itself. Values are
//! bound as `jsonb` and converted to column types through
//! `jsonb_populate_record(NULL::<table>, ...)`, so the Rust side never needs
//! to know a column's SQL type.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::error::ErrorKind;
use sqlx::PgPool;

use super::catalog::{self, RelationKind, TableDef};
use super::{Direction, Embed, Filter, Gateway, GatewayError, Query, Record};

/// SQL text plus its positional `jsonb` binds.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub binds: Vec<Value>,
}

impl Statement {
    fn new() -> Self {
        Self {
            sql: String::new(),
            binds: Vec::new(),
        }
    }

    /// Register a bind and return its placeholder.
    fn bind(&mut self, value: Value) -> String {
        self.binds.push(value);
        format!("${}::jsonb", self.binds.len())
    }
}

fn ident(name: &str) -> String {
    format!("\"{name}\"")
}

fn alias(depth: usize) -> String {
    format!("t{depth}")
}

/// JSON object expression for the row bound to `alias`.
fn row_object(columns: &[String], alias: &str) -> String {
    if columns.is_empty() {
        return format!("to_jsonb({alias})");
    }
    let pairs: Vec<String> = columns
        .iter()
        .map(|c| format!("'{c}', {alias}.{}", ident(c)))
        .collect();
    format!("jsonb_build_object({})", pairs.join(", "))
}

/// `{column: value}`, the shape `jsonb_populate_record` expects.
fn single(column: &str, value: &Value) -> Value {
    let mut map = Record::new();
    map.insert(column.to_string(), value.clone());
    Value::Object(map)
}

/// Tie-broken ordering used for embedded collections.
fn default_order(def: &TableDef, alias: &str) -> String {
    if def.has_column("created_at") {
        format!("{alias}.\"created_at\", {alias}.\"id\"")
    } else {
        format!("{alias}.\"id\"")
    }
}

fn row_expression(
    stmt: &mut Statement,
    def: &TableDef,
    columns: &[String],
    embeds: &[Embed],
    depth: usize,
) -> Result<String, GatewayError> {
    let me = alias(depth);
    let mut expr = row_object(columns, &me);
    for embed in embeds {
        let relation = def.require_relation(&embed.relation)?;
        let target = catalog::table(relation.table)?;
        let child = alias(depth + 1);
        let child_row = row_expression(stmt, target, &embed.columns, &embed.embeds, depth + 1)?;
        let sub = match relation.kind {
            RelationKind::BelongsTo { column } => format!(
                "(SELECT {child_row} FROM {} AS {child} WHERE {child}.\"id\" = {me}.{})",
                ident(target.name),
                ident(column)
            ),
            RelationKind::HasMany { foreign_column } => format!(
                "(SELECT COALESCE(jsonb_agg({child_row} ORDER BY {}), '[]'::jsonb) FROM {} AS {child} WHERE {child}.{} = {me}.\"id\")",
                default_order(target, &child),
                ident(target.name),
                ident(foreign_column)
            ),
        };
        expr = format!("{expr} || jsonb_build_object('{}', {sub})", embed.relation);
    }
    Ok(expr)
}

fn where_clause(
    stmt: &mut Statement,
    def: &TableDef,
    filters: &[Filter],
    alias: &str,
) -> String {
    let conditions: Vec<String> = filters
        .iter()
        .map(|filter| match filter {
            Filter::Eq(column, Value::Null) => format!("{alias}.{} IS NULL", ident(column)),
            Filter::Eq(column, value) => {
                let p = stmt.bind(single(column, value));
                format!(
                    "{alias}.{col} = (jsonb_populate_record(NULL::{tbl}, {p})).{col}",
                    col = ident(column),
                    tbl = ident(def.name)
                )
            }
            Filter::In(_, values) if values.is_empty() => "FALSE".to_string(),
            Filter::In(column, values) => {
                let rows: Vec<Value> = values
                    .iter()
                    .map(|v| single(column, v))
                    .collect();
                let p = stmt.bind(Value::Array(rows));
                format!(
                    "{alias}.{col} IN (SELECT p.{col} FROM jsonb_populate_recordset(NULL::{tbl}, {p}) AS p)",
                    col = ident(column),
                    tbl = ident(def.name)
                )
            }
        })
        .collect();

    if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    }
}

pub fn build_select(query: &Query) -> Result<Statement, GatewayError> {
    let def = catalog::validate_query(query)?;
    let mut stmt = Statement::new();
    let row = row_expression(&mut stmt, def, &query.columns, &query.embeds, 0)?;
    let filters = where_clause(&mut stmt, def, &query.filters, "t0");

    let mut sql = format!("SELECT {row} AS row_data FROM {} AS t0{filters}", ident(def.name));
    if let Some(order) = &query.order {
        let dir = match order.direction {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        };
        sql.push_str(&format!(
            " ORDER BY t0.{} {dir}, t0.\"id\" {dir}",
            ident(&order.column)
        ));
    }
    if let Some(limit) = query.limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }
    stmt.sql = sql;
    Ok(stmt)
}

pub fn build_count(query: &Query) -> Result<Statement, GatewayError> {
    let def = catalog::validate_query(query)?;
    let mut stmt = Statement::new();
    let filters = where_clause(&mut stmt, def, &query.filters, "t0");
    stmt.sql = format!("SELECT COUNT(*) FROM {} AS t0{filters}", ident(def.name));
    Ok(stmt)
}

/// Union of keys across rows, sorted for stable SQL.
fn insert_columns(def: &TableDef, rows: &[Record]) -> Result<Vec<String>, GatewayError> {
    let mut columns: Vec<String> = rows.iter().flat_map(|r| r.keys().cloned()).collect();
    columns.sort();
    columns.dedup();
    catalog::validate_columns(def, columns.iter().map(String::as_str))?;
    if columns.is_empty() {
        return Err(GatewayError::Rejected(format!(
            "insert into {} names no columns",
            def.name
        )));
    }
    Ok(columns)
}

fn insert_prefix(stmt: &mut Statement, def: &TableDef, columns: &[String], rows: Vec<Record>) -> String {
    let list = columns.iter().map(|c| ident(c)).collect::<Vec<_>>().join(", ");
    let projected = columns
        .iter()
        .map(|c| format!("p.{}", ident(c)))
        .collect::<Vec<_>>()
        .join(", ");
    let p = stmt.bind(Value::Array(rows.into_iter().map(Value::Object).collect()));
    format!(
        "INSERT INTO {tbl} AS t ({list}) SELECT {projected} FROM jsonb_populate_recordset(NULL::{tbl}, {p}) AS p",
        tbl = ident(def.name)
    )
}

pub fn build_insert(table: &str, rows: Vec<Record>) -> Result<Statement, GatewayError> {
    let def = catalog::table(table)?;
    let columns = insert_columns(def, &rows)?;
    let mut stmt = Statement::new();
    let prefix = insert_prefix(&mut stmt, def, &columns, rows);
    stmt.sql = format!("{prefix} RETURNING to_jsonb(t)");
    Ok(stmt)
}

pub fn build_upsert(table: &str, row: Record, on_conflict: &[&str]) -> Result<Statement, GatewayError> {
    let def = catalog::table(table)?;
    if on_conflict.is_empty() {
        return Err(GatewayError::Rejected(format!(
            "upsert into {table} needs conflict columns"
        )));
    }
    catalog::validate_columns(def, on_conflict.iter().copied())?;
    let columns = insert_columns(def, std::slice::from_ref(&row))?;
    if let Some(missing) = on_conflict.iter().find(|c| !columns.iter().any(|k| k == *c)) {
        return Err(GatewayError::Rejected(format!(
            "upsert into {table} is missing conflict column {missing}"
        )));
    }

    let mut updates: Vec<String> = columns
        .iter()
        .filter(|c| !on_conflict.contains(&c.as_str()))
        .map(|c| format!("{col} = EXCLUDED.{col}", col = ident(c)))
        .collect();
    if updates.is_empty() {
        updates.push(format!("{col} = EXCLUDED.{col}", col = ident(on_conflict[0])));
    }

    let mut stmt = Statement::new();
    let prefix = insert_prefix(&mut stmt, def, &columns, vec![row]);
    let target = on_conflict.iter().map(|c| ident(c)).collect::<Vec<_>>().join(", ");
    stmt.sql = format!(
        "{prefix} ON CONFLICT ({target}) DO UPDATE SET {} RETURNING to_jsonb(t)",
        updates.join(", ")
    );
    Ok(stmt)
}

pub fn build_update(table: &str, filters: &[Filter], patch: Record) -> Result<Statement, GatewayError> {
    let def = catalog::table(table)?;
    if filters.is_empty() {
        return Err(GatewayError::Rejected(format!("unfiltered update of {table}")));
    }
    if patch.is_empty() {
        return Err(GatewayError::Rejected(format!("empty update of {table}")));
    }
    catalog::validate_columns(def, filters.iter().map(Filter::column))?;
    catalog::validate_columns(def, patch.keys().map(String::as_str))?;

    let mut stmt = Statement::new();
    let conditions = where_clause(&mut stmt, def, filters, "t");
    let sets = patch
        .keys()
        .map(|c| format!("{col} = p.{col}", col = ident(c)))
        .collect::<Vec<_>>()
        .join(", ");
    let p = stmt.bind(Value::Object(patch));
    stmt.sql = format!(
        "UPDATE {tbl} AS t SET {sets} FROM jsonb_populate_record(NULL::{tbl}, {p}) AS p{conditions} RETURNING to_jsonb(t)",
        tbl = ident(def.name)
    );
    Ok(stmt)
}

pub fn build_delete(table: &str, filters: &[Filter]) -> Result<Statement, GatewayError> {
    let def = catalog::table(table)?;
    if filters.is_empty() {
        return Err(GatewayError::Rejected(format!("unfiltered delete of {table}")));
    }
    catalog::validate_columns(def, filters.iter().map(Filter::column))?;
    let mut stmt = Statement::new();
    let conditions = where_clause(&mut stmt, def, filters, "t");
    stmt.sql = format!("DELETE FROM {} AS t{conditions}", ident(def.name));
    Ok(stmt)
}

impl From<sqlx::Error> for GatewayError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db_err) => match db_err.kind() {
                ErrorKind::UniqueViolation => GatewayError::UniqueViolation(db_err.message().to_string()),
                ErrorKind::ForeignKeyViolation
                | ErrorKind::NotNullViolation
                | ErrorKind::CheckViolation => {
                    GatewayError::ConstraintViolation(db_err.message().to_string())
                }
                _ => GatewayError::Backend(e.to_string()),
            },
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                GatewayError::Unavailable(e.to_string())
            }
            _ => GatewayError::Backend(e.to_string()),
        }
    }
}

fn into_records(table: &str, rows: Vec<Value>) -> Result<Vec<Record>, GatewayError> {
    rows.into_iter()
        .map(|row| match row {
            Value::Object(map) => Ok(map),
            other => Err(GatewayError::Decode {
                table: table.to_string(),
                message: format!("expected object row, got {other}"),
            }),
        })
        .collect()
}

/// Gateway backed by a PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PgGateway {
    pool: PgPool,
}

impl PgGateway {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_rows(&self, table: &str, stmt: Statement) -> Result<Vec<Record>, GatewayError> {
        let mut query = sqlx::query_scalar::<_, Value>(&stmt.sql);
        for bind in stmt.binds {
            query = query.bind(bind);
        }
        let rows = query.fetch_all(&self.pool).await?;
        into_records(table, rows)
    }
}

#[async_trait]
impl Gateway for PgGateway {
    async fn select(&self, query: &Query) -> Result<Vec<Record>, GatewayError> {
        let stmt = build_select(query)?;
        tracing::trace!(table = %query.table, sql = %stmt.sql, "Gateway select");
        self.fetch_rows(&query.table, stmt).await
    }

    async fn count(&self, query: &Query) -> Result<i64, GatewayError> {
        let stmt = build_count(query)?;
        let mut q = sqlx::query_scalar::<_, i64>(&stmt.sql);
        for bind in stmt.binds {
            q = q.bind(bind);
        }
        Ok(q.fetch_one(&self.pool).await?)
    }

    async fn insert(&self, table: &str, rows: Vec<Record>) -> Result<Vec<Record>, GatewayError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let stmt = build_insert(table, rows)?;
        self.fetch_rows(table, stmt).await
    }

    async fn upsert(
        &self,
        table: &str,
        row: Record,
        on_conflict: &[&str],
    ) -> Result<Record, GatewayError> {
        let stmt = build_upsert(table, row, on_conflict)?;
        self.fetch_rows(table, stmt)
            .await?
            .pop()
            .ok_or_else(|| GatewayError::Backend(format!("upsert into {table} returned no row")))
    }

    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: Record,
    ) -> Result<Vec<Record>, GatewayError> {
        let stmt = build_update(table, filters, patch)?;
        self.fetch_rows(table, stmt).await
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<u64, GatewayError> {
        let stmt = build_delete(table, filters)?;
        let mut q = sqlx::query(&stmt.sql);
        for bind in stmt.binds {
            q = q.bind(bind);
        }
        Ok(q.execute(&self.pool).await?.rows_affected())
    }

    async fn ping(&self) -> Result<(), GatewayError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn select_with_filter_order_limit() {
        let user = Uuid::nil();
        let q = Query::table("payments")
            .select(&["id", "amount", "status", "created_at"])
            .eq("payee_id", user)
            .order_by("created_at", Direction::Desc)
            .limit(5);
        let stmt = build_select(&q).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT jsonb_build_object('id', t0.\"id\", 'amount', t0.\"amount\", 'status', t0.\"status\", 'created_at', t0.\"created_at\") AS row_data \
             FROM \"payments\" AS t0 \
             WHERE t0.\"payee_id\" = (jsonb_populate_record(NULL::\"payments\", $1::jsonb)).\"payee_id\" \
             ORDER BY t0.\"created_at\" DESC, t0.\"id\" DESC LIMIT 5"
        );
        assert_eq!(stmt.binds, vec![json!({ "payee_id": user.to_string() })]);
    }

    #[test]
    fn belongs_to_embed_is_a_correlated_subquery() {
        let q = Query::table("applications")
            .select(&["id"])
            .embed(Embed::new("jobs", &["title"]));
        let stmt = build_select(&q).unwrap();
        assert!(stmt.sql.contains(
            "|| jsonb_build_object('jobs', (SELECT jsonb_build_object('title', t1.\"title\") FROM \"jobs\" AS t1 WHERE t1.\"id\" = t0.\"job_id\"))"
        ));
    }

    #[test]
    fn has_many_embed_aggregates_with_empty_default() {
        let q = Query::table("jobs").embed(Embed::new("applications", &["id", "applicant_id"]));
        let stmt = build_select(&q).unwrap();
        assert!(stmt.sql.contains("COALESCE(jsonb_agg("));
        assert!(stmt.sql.contains("'[]'::jsonb"));
        assert!(stmt.sql.contains("WHERE t1.\"job_id\" = t0.\"id\""));
        assert!(stmt.sql.starts_with("SELECT to_jsonb(t0) ||"));
    }

    #[test]
    fn in_filter_binds_a_recordset() {
        let ids = [Uuid::nil(), Uuid::max()];
        let q = Query::table("profiles").is_in("id", ids);
        let stmt = build_select(&q).unwrap();
        assert!(stmt.sql.contains("t0.\"id\" IN (SELECT p.\"id\" FROM jsonb_populate_recordset(NULL::\"profiles\", $1::jsonb) AS p)"));
        assert_eq!(stmt.binds[0].as_array().unwrap().len(), 2);
    }

    #[test]
    fn empty_in_filter_matches_nothing() {
        let q = Query::table("profiles").is_in("id", Vec::<Uuid>::new());
        let stmt = build_select(&q).unwrap();
        assert!(stmt.sql.ends_with("WHERE FALSE"));
        assert!(stmt.binds.is_empty());
    }

    #[test]
    fn null_equality_uses_is_null() {
        let q = Query::table("user_progress").eq("lesson_id", Value::Null);
        let stmt = build_select(&q).unwrap();
        assert!(stmt.sql.ends_with("WHERE t0.\"lesson_id\" IS NULL"));
    }

    #[test]
    fn count_ignores_projection() {
        let q = Query::table("course_likes")
            .select(&["id"])
            .eq("learning_path_id", Uuid::nil());
        let stmt = build_count(&q).unwrap();
        assert!(stmt.sql.starts_with("SELECT COUNT(*) FROM \"course_likes\" AS t0 WHERE"));
    }

    #[test]
    fn insert_uses_sorted_column_union() {
        let mut a = Record::new();
        a.insert("title".into(), json!("Intro"));
        a.insert("learning_path_id".into(), json!(Uuid::nil()));
        let mut b = a.clone();
        b.insert("order_index".into(), json!(2));
        let stmt = build_insert("lessons", vec![a, b]).unwrap();
        assert!(stmt.sql.starts_with(
            "INSERT INTO \"lessons\" AS t (\"learning_path_id\", \"order_index\", \"title\") SELECT p.\"learning_path_id\", p.\"order_index\", p.\"title\""
        ));
        assert!(stmt.sql.ends_with("RETURNING to_jsonb(t)"));
        assert_eq!(stmt.binds.len(), 1);
    }

    #[test]
    fn insert_rejects_unknown_column() {
        let mut row = Record::new();
        row.insert("password".into(), json!("x"));
        assert!(matches!(
            build_insert("profiles", vec![row]),
            Err(GatewayError::Rejected(_))
        ));
    }

    #[test]
    fn upsert_updates_non_conflict_columns() {
        let mut row = Record::new();
        row.insert("user_id".into(), json!(Uuid::nil()));
        row.insert("lesson_id".into(), json!(Uuid::nil()));
        row.insert("completed".into(), json!(true));
        let stmt = build_upsert("user_progress", row, &["user_id", "lesson_id"]).unwrap();
        assert!(stmt.sql.contains(
            "ON CONFLICT (\"user_id\", \"lesson_id\") DO UPDATE SET \"completed\" = EXCLUDED.\"completed\""
        ));
    }

    #[test]
    fn update_binds_filters_before_patch() {
        let mut patch = Record::new();
        patch.insert("status".into(), json!("accepted"));
        let filters = [
            crate::gateway::eq("id", Uuid::nil()),
            crate::gateway::eq("status", "pending"),
        ];
        let stmt = build_update("applications", &filters, patch).unwrap();
        assert!(stmt.sql.starts_with(
            "UPDATE \"applications\" AS t SET \"status\" = p.\"status\" FROM jsonb_populate_record(NULL::\"applications\", $3::jsonb) AS p WHERE"
        ));
        assert_eq!(stmt.binds.len(), 3);
        assert_eq!(stmt.binds[2], json!({ "status": "accepted" }));
    }

    #[test]
    fn unfiltered_writes_are_refused() {
        let mut patch = Record::new();
        patch.insert("status".into(), json!("closed"));
        assert!(build_update("jobs", &[], patch).is_err());
        assert!(build_delete("course_likes", &[]).is_err());
    }
}
