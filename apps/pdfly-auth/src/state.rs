//! Application state for the auth service

use crate::jwt::TokenSigner;
use anyhow::Result;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::path::PathBuf;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub signer: TokenSigner,
}

impl AppState {
    pub async fn new(database_url: Option<&str>, signer: TokenSigner) -> Result<Self> {
        let db_url = match database_url {
            Some(url) => url.to_string(),
            None => default_database_url()?,
        };

        tracing::info!("Connecting to database: {}", db_url);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await?;

        Self::run_migrations(&pool).await?;
        Ok(Self { db: pool, signer })
    }

    /// Private in-memory database; a single connection so every query sees
    /// the same data
    pub async fn in_memory(signer: TokenSigner) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        Self::run_migrations(&pool).await?;
        Ok(Self { db: pool, signer })
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS auth_identities (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS profiles (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL,
                username TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
        )
        .execute(pool)
        .await?;

        tracing::info!("Migrations complete");
        Ok(())
    }
}

fn default_database_url() -> Result<String> {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pdfly-auth");
    std::fs::create_dir_all(&data_dir)?;
    Ok(format!("sqlite:{}/auth.db?mode=rwc", data_dir.display()))
}
