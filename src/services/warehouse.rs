/// Query execution against the analytical warehouse
///
/// The warehouse is any engine speaking the Postgres protocol that can also
/// invoke a trained rating model from SQL (e.g. PostgresML's `pgml.predict`).
/// Rows come back as JSON objects so the normalizer can cope with whatever
/// shape a query produces.
use futures::{stream::BoxStream, StreamExt, TryStreamExt};
use serde_json::Value;
use sqlx::{postgres::PgArguments, query::Query, PgPool, Postgres, Row};

use crate::error::QueryExecutionError;

/// One result row as returned by the engine, shape not yet checked
pub type RawRow = Value;

/// Single-pass, lazily fetched result rows
pub type RowStream<'a> = BoxStream<'a, Result<RawRow, QueryExecutionError>>;

/// A value bound to a positional `$n` placeholder
#[derive(Debug, Clone, PartialEq)]
pub enum QueryParam {
    IdArray(Vec<i64>),
    Int(i64),
    Float(f64),
    Text(String),
}

/// SQL text plus its bound parameters, in placeholder order
#[derive(Debug, Clone, PartialEq)]
pub struct BoundQuery {
    pub sql: String,
    pub params: Vec<QueryParam>,
    json_rows_sql: String,
}

impl BoundQuery {
    pub fn new(sql: String, params: Vec<QueryParam>) -> Self {
        // Every row comes back as a single `jsonb` column, numbered in the inner
        // query's order and returned sorted on that number
        let json_rows_sql = format!(
            "SELECT to_jsonb(q) AS row_json, row_number() OVER () AS row_rank \
             FROM ({}) AS q ORDER BY row_rank",
            sql
        );
        Self {
            sql,
            params,
            json_rows_sql,
        }
    }

    fn json_rows_sql(&self) -> &str {
        &self.json_rows_sql
    }
}

/// Executes bound queries against the warehouse
pub trait AnalyticalEngine: Send + Sync {
    /// Starts the query; rows (and any failure) arrive through the stream
    fn execute<'a>(&'a self, query: &'a BoundQuery) -> RowStream<'a>;

    /// Engine name for logging
    fn name(&self) -> &'static str;
}

/// [`AnalyticalEngine`] backed by a sqlx Postgres pool
#[derive(Clone)]
pub struct PgWarehouse {
    pool: PgPool,
}

impl PgWarehouse {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn bind_param<'q>(
    query: Query<'q, Postgres, PgArguments>,
    param: &QueryParam,
) -> Query<'q, Postgres, PgArguments> {
    match param {
        QueryParam::IdArray(ids) => query.bind(ids.clone()),
        QueryParam::Int(v) => query.bind(*v),
        QueryParam::Float(v) => query.bind(*v),
        QueryParam::Text(v) => query.bind(v.clone()),
    }
}

impl AnalyticalEngine for PgWarehouse {
    fn execute<'a>(&'a self, query: &'a BoundQuery) -> RowStream<'a> {
        query
            .params
            .iter()
            .fold(sqlx::query(query.json_rows_sql()), bind_param)
            .fetch(&self.pool)
            .map_err(QueryExecutionError::from)
            .and_then(|row| async move {
                row.try_get::<Value, _>("row_json")
                    .map_err(|e| QueryExecutionError::RowDecode(e.to_string()))
            })
            .boxed()
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
