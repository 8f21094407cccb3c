//! PostgreSQL client implementation
//!
//! Pooled, read-only access to the system of record.

use crate::config::schema::PostgreSQLConfig;
use crate::domain::{Result, SemanticError, SourceError};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use secrecy::ExposeSecret;
use std::time::Duration;
use tokio_postgres::{NoTls, Row, Statement};

/// PostgreSQL client for the remote HR database
pub struct PostgreSQLClient {
    /// Connection pool
    pool: Pool,

    /// Configuration
    config: PostgreSQLConfig,
}

impl PostgreSQLClient {
    /// Create a new PostgreSQL client
    ///
    /// The pool is built lazily; no connection is opened until the first
    /// query.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection string cannot be parsed or the pool
    /// cannot be built.
    pub async fn new(config: PostgreSQLConfig) -> Result<Self> {
        let pg_config: tokio_postgres::Config = config
            .connection_string
            .expose_secret()
            .parse()
            .map_err(|e: tokio_postgres::Error| {
                SemanticError::Configuration(format!("Invalid PostgreSQL connection string: {}", e))
            })?;

        let manager_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };
        let manager = Manager::from_config(pg_config, NoTls, manager_config);

        let timeout = Duration::from_secs(config.connection_timeout_seconds);
        let pool = Pool::builder(manager)
            .max_size(config.max_connections)
            .wait_timeout(Some(timeout))
            .create_timeout(Some(timeout))
            .recycle_timeout(Some(timeout))
            .runtime(deadpool_postgres::Runtime::Tokio1)
            .build()
            .map_err(|e| {
                SemanticError::Database(format!("Failed to create connection pool: {}", e))
            })?;

        Ok(Self { pool, config })
    }

    pub fn schema(&self) -> &str {
        &self.config.schema
    }

    /// Attempts to get a connection from the pool and run `SELECT 1`
    pub async fn test_connection(&self) -> Result<()> {
        let client = self.get_connection().await?;
        client
            .query_one("SELECT 1", &[])
            .await
            .map_err(|e| SourceError::ConnectionFailed(format!("Connection test failed: {}", e)))?;

        tracing::info!(endpoint = %self.connection_string_safe(), "PostgreSQL connection test successful");
        Ok(())
    }

    /// Get a connection from the pool with the statement timeout applied
    pub async fn get_connection(&self) -> Result<deadpool_postgres::Object> {
        let client = self.pool.get().await.map_err(|e| {
            SourceError::ConnectionFailed(format!("Failed to get connection from pool: {}", e))
        })?;

        let timeout_query = format!(
            "SET statement_timeout = {}",
            self.config.statement_timeout_seconds * 1000
        );
        client
            .batch_execute(&timeout_query)
            .await
            .map_err(|e| SourceError::QueryFailed(format!("Failed to set statement timeout: {}", e)))?;
        Ok(client)
    }

    /// Prepares a statement, returning its column metadata
    pub async fn prepare(&self, query: &str) -> Result<Statement> {
        let client = self.get_connection().await?;
        client
            .prepare(query)
            .await
            .map_err(|e| SourceError::QueryFailed(format!("Prepare failed: {}", e)).into())
    }

    /// Execute a query and return rows
    pub async fn query(
        &self,
        query: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<Vec<Row>> {
        let client = self.get_connection().await?;
        client
            .query(query, params)
            .await
            .map_err(|e| SourceError::QueryFailed(e.to_string()).into())
    }

    /// Connection target with credentials redacted
    pub fn connection_string_safe(&self) -> String {
        self.config.connection_string.expose_secret().redacted()
    }

    pub fn pool_status(&self) -> deadpool_postgres::Status {
        self.pool.status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::secret_string;

    fn config(conn: &str) -> PostgreSQLConfig {
        PostgreSQLConfig {
            connection_string: secret_string(conn.to_string()),
            schema: "public".to_string(),
            max_connections: 4,
            connection_timeout_seconds: 5,
            statement_timeout_seconds: 60,
        }
    }

    #[tokio::test]
    async fn test_connection_string_safe() {
        let client = PostgreSQLClient::new(config("postgresql://hr:pw@db:5432/hrms"))
            .await
            .unwrap();
        assert_eq!(client.connection_string_safe(), "postgresql://***@db:5432/hrms");
    }

    #[tokio::test]
    async fn test_new_builds_pool_without_connecting() {
        let client = PostgreSQLClient::new(config("postgresql://hr:pw@localhost:5432/hrms"))
            .await
            .unwrap();
        assert_eq!(client.schema(), "public");
        assert_eq!(client.pool_status().max_size, 4);
    }

    #[tokio::test]
    async fn test_new_rejects_invalid_connection_string() {
        let result = PostgreSQLClient::new(config("host=localhost port=notaport")).await;
        assert!(matches!(result, Err(SemanticError::Configuration(_))));
    }
}
