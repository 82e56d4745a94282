// src/db/mod.rs

use std::env;
use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};

pub async fn connect() -> anyhow::Result<Pool<Postgres>> {
    let database_url = env::var("DATABASE_URL")
        .context("DATABASE_URL must point at the hosted Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    println!("✅ Connected to PostgreSQL");
    Ok(pool)
}
