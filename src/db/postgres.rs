use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};
use std::{str::FromStr, time::Duration};

/// Creates the connection pool for the analytical warehouse
///
/// Every session gets a server-side `statement_timeout`, so a runaway
/// recommendation query is cancelled by the engine instead of holding the
/// request open indefinitely.
pub async fn create_pool(
    warehouse_url: &str,
    max_connections: u32,
    query_timeout: Duration,
) -> anyhow::Result<PgPool> {
    let options = PgConnectOptions::from_str(warehouse_url)?.options([(
        "statement_timeout",
        format!("{}ms", query_timeout.as_millis()),
    )]);

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(query_timeout)
        .connect_with(options)
        .await?;

    Ok(pool)
}
