use serde_json::Value;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, TypeInfo, ValueRef};

use crate::SqlToolError;

/// Handle to the SQLite database the agent queries. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SqlDatabase {
    pool: SqlitePool,
}

#[derive(Debug, Clone)]
pub struct SqlDatabaseBuilder {
    database_url: String,
    max_connections: u32,
}

impl SqlDatabase {
    pub fn builder(database_url: impl Into<String>) -> SqlDatabaseBuilder {
        SqlDatabaseBuilder {
            database_url: database_url.into(),
            max_connections: 1,
        }
    }

    pub async fn connect(database_url: &str) -> Result<Self, SqlToolError> {
        Self::builder(database_url).build().await
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// User table names, in storage order.
    pub async fn list_tables(&self) -> Result<Vec<String>, SqlToolError> {
        let rows = sqlx::query(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(SqlToolError::Query)?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("name"))
            .collect::<Result<_, _>>()
            .map_err(SqlToolError::Query)
    }

    /// `CREATE TABLE` statements for the named tables, in the order asked.
    /// Names that do not exist are skipped.
    pub async fn describe_tables(&self, table_names: &[String]) -> Result<String, SqlToolError> {
        if table_names.is_empty() {
            return Ok(String::new());
        }

        let placeholders = vec!["?"; table_names.len()].join(", ");
        let sql = format!(
            "SELECT name, sql FROM sqlite_master WHERE type = 'table' AND name IN ({placeholders})"
        );
        let mut query = sqlx::query(&sql);
        for name in table_names {
            query = query.bind(name);
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(SqlToolError::Query)?;

        let mut found = Vec::with_capacity(rows.len());
        for row in &rows {
            let name: String = row.try_get("name").map_err(SqlToolError::Query)?;
            let ddl: Option<String> = row.try_get("sql").map_err(SqlToolError::Query)?;
            found.push((name, ddl.unwrap_or_default()));
        }

        let schemas: Vec<String> = table_names
            .iter()
            .filter_map(|wanted| {
                found
                    .iter()
                    .find(|(name, _)| name == wanted)
                    .map(|(_, ddl)| ddl.clone())
            })
            .collect();
        Ok(schemas.join("\n"))
    }

    /// Run `query` and return each row as an array of JSON cells.
    pub async fn run_query(&self, query: &str) -> Result<Vec<Vec<Value>>, SqlToolError> {
        tracing::debug!(query, "running sqlite query");
        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .await
            .map_err(SqlToolError::Query)?;

        rows.iter()
            .map(|row| {
                (0..row.columns().len())
                    .map(|index| decode_cell(row, index))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<_, _>>()
            .map_err(SqlToolError::Query)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

// Cells are typed by their stored value, not the declared column type.
fn decode_cell(row: &SqliteRow, index: usize) -> Result<Value, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let storage = raw.type_info().name().to_string();

    let value = match storage.as_str() {
        "INTEGER" | "BOOLEAN" => Value::from(row.try_get_unchecked::<i64, _>(index)?),
        "REAL" => Value::from(row.try_get_unchecked::<f64, _>(index)?),
        "BLOB" => {
            let bytes = row.try_get_unchecked::<Vec<u8>, _>(index)?;
            Value::String(format!("<blob {} bytes>", bytes.len()))
        }
        _ => Value::String(row.try_get_unchecked::<String, _>(index)?),
    };
    Ok(value)
}

impl SqlDatabaseBuilder {
    /// In-memory databases need a single connection to keep one shared store.
    pub fn max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub async fn build(self) -> Result<SqlDatabase, SqlToolError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(self.max_connections)
            .connect(&self.database_url)
            .await
            .map_err(SqlToolError::Connection)?;
        tracing::info!(url = %self.database_url, "connected to sqlite");

        Ok(SqlDatabase { pool })
    }
}
