//! Data access gateway: table-oriented queries and writes over the schema.
//!
//! Services never talk to the database directly. They describe what they
//! want as a [`Query`] (or a write against a named table) and decode the
//! returned JSON records into typed models with [`fetch_all`],
//! [`fetch_optional`] and friends. Every table, column and relation name is
//! checked against the [`catalog`] before anything is executed.

pub mod catalog;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

pub use memory::InMemoryGateway;
pub use postgres::PgGateway;

/// One row as returned by the gateway.
pub type Record = serde_json::Map<String, Value>;

/// Gateway failures. Services decide per call whether these propagate.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    #[error("Rejected query: {0}")]
    Rejected(String),

    #[error("Could not decode {table} row: {message}")]
    Decode { table: String, message: String },

    #[error("Expected at most one row from {0}")]
    MultipleRows(String),

    #[error("Unique violation: {0}")]
    UniqueViolation(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// Conjunctive row filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    In(String, Vec<Value>),
}

impl Filter {
    pub fn column(&self) -> &str {
        match self {
            Filter::Eq(column, _) | Filter::In(column, _) => column,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub direction: Direction,
}

/// Nested relation expansion, e.g. `applications -> jobs(title, company_name)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Embed {
    pub relation: String,
    /// Empty means every column of the related table.
    pub columns: Vec<String>,
    pub embeds: Vec<Embed>,
}

impl Embed {
    pub fn new(relation: &str, columns: &[&str]) -> Self {
        Self {
            relation: relation.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            embeds: Vec::new(),
        }
    }

    pub fn with(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }
}

/// A read against one table.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: String,
    /// Empty means every column.
    pub columns: Vec<String>,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<i64>,
    pub embeds: Vec<Embed>,
}

impl Query {
    pub fn table(name: &str) -> Self {
        Self {
            table: name.to_string(),
            columns: Vec::new(),
            filters: Vec::new(),
            order: None,
            limit: None,
            embeds: Vec::new(),
        }
    }

    pub fn select(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn eq<V: Serialize>(mut self, column: &str, value: V) -> Self {
        self.filters.push(Filter::Eq(column.to_string(), to_value(value)));
        self
    }

    pub fn is_in<V: Serialize>(mut self, column: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.filters.push(Filter::In(
            column.to_string(),
            values.into_iter().map(to_value).collect(),
        ));
        self
    }

    pub fn order_by(mut self, column: &str, direction: Direction) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }
}

/// Build an equality filter outside of a [`Query`] (for updates and deletes).
pub fn eq<V: Serialize>(column: &str, value: V) -> Filter {
    Filter::Eq(column.to_string(), to_value(value))
}

fn to_value<V: Serialize>(value: V) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Table-oriented data access used by every service.
#[async_trait]
pub trait Gateway: Send + Sync + std::fmt::Debug {
    async fn select(&self, query: &Query) -> Result<Vec<Record>, GatewayError>;

    /// Count-only mode: only `table` and `filters` of the query are used.
    async fn count(&self, query: &Query) -> Result<i64, GatewayError>;

    /// Insert all rows as one statement; either every row lands or none does.
    async fn insert(&self, table: &str, rows: Vec<Record>) -> Result<Vec<Record>, GatewayError>;

    /// Insert, or update the existing row matching `on_conflict` columns.
    async fn upsert(
        &self,
        table: &str,
        row: Record,
        on_conflict: &[&str],
    ) -> Result<Record, GatewayError>;

    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: Record,
    ) -> Result<Vec<Record>, GatewayError>;

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<u64, GatewayError>;

    /// Readiness probe.
    async fn ping(&self) -> Result<(), GatewayError>;
}

/// Decode one record into a typed model.
pub fn decode<T: DeserializeOwned>(table: &str, record: Record) -> Result<T, GatewayError> {
    serde_json::from_value(Value::Object(record)).map_err(|e| GatewayError::Decode {
        table: table.to_string(),
        message: e.to_string(),
    })
}

/// Serialize a typed write model into a record.
pub fn to_record<T: Serialize>(table: &str, value: &T) -> Result<Record, GatewayError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(GatewayError::Rejected(format!(
            "write to {table} must be a JSON object"
        ))),
        Err(e) => Err(GatewayError::Rejected(format!(
            "write to {table} could not be serialized: {e}"
        ))),
    }
}

/// Run a query and decode every row.
pub async fn fetch_all<T: DeserializeOwned>(
    gateway: &dyn Gateway,
    query: &Query,
) -> Result<Vec<T>, GatewayError> {
    gateway
        .select(query)
        .await?
        .into_iter()
        .map(|record| decode(&query.table, record))
        .collect()
}

/// Run a query expected to match at most one row.
pub async fn fetch_optional<T: DeserializeOwned>(
    gateway: &dyn Gateway,
    query: &Query,
) -> Result<Option<T>, GatewayError> {
    let bounded = query.clone().limit(2);
    let mut rows = gateway.select(&bounded).await?;
    match rows.len() {
        0 => Ok(None),
        1 => rows
            .pop()
            .map(|record| decode(&query.table, record))
            .transpose(),
        _ => Err(GatewayError::MultipleRows(query.table.clone())),
    }
}

/// Insert one typed row and decode the stored result.
pub async fn insert_one<I: Serialize, T: DeserializeOwned>(
    gateway: &dyn Gateway,
    table: &str,
    row: &I,
) -> Result<T, GatewayError> {
    let record = to_record(table, row)?;
    let mut stored = gateway.insert(table, vec![record]).await?;
    let first = stored
        .pop()
        .ok_or_else(|| GatewayError::Backend(format!("insert into {table} returned no row")))?;
    decode(table, first)
}

/// Insert many typed rows in one statement and decode the stored results.
pub async fn insert_many<I: Serialize, T: DeserializeOwned>(
    gateway: &dyn Gateway,
    table: &str,
    rows: &[I],
) -> Result<Vec<T>, GatewayError> {
    let records = rows
        .iter()
        .map(|row| to_record(table, row))
        .collect::<Result<Vec<_>, _>>()?;
    gateway
        .insert(table, records)
        .await?
        .into_iter()
        .map(|record| decode(table, record))
        .collect()
}
