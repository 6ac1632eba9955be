use std::time::Duration;

use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, Statement};
use settings::Database;

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;
    let mut tasks = tokio::task::JoinSet::new();

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "saldo={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    if let Some(server) = settings.server {
        let db = match parse_database(&server.database).await {
            Ok(db) => db,
            Err(err) => {
                tracing::error!("failed to initialize database: {err}");
                return Err(err);
            }
        };

        let sweep_db = db.clone();
        let sweep_interval = Duration::from_secs(server.catch_up_hours.unwrap_or(24) * 3600);
        tasks.spawn(async move {
            let engine = match engine::Engine::builder().database(sweep_db.clone()).build().await {
                Ok(engine) => engine,
                Err(err) => {
                    tracing::error!("failed to build engine for sweep: {err}");
                    return;
                }
            };
            let mut ticker = tokio::time::interval(sweep_interval);
            loop {
                ticker.tick().await;
                if let Err(err) = sweep_installments(&engine, &sweep_db).await {
                    tracing::error!("installment sweep failed: {err}");
                }
            }
        });

        tasks.spawn(async move {
            tracing::info!("Found server settings...");
            let engine = match engine::Engine::builder().database(db.clone()).build().await {
                Ok(engine) => engine,
                Err(err) => {
                    tracing::error!("failed to build engine from database: {err}");
                    return;
                }
            };
            let bind = server.bind.unwrap_or_else(|| "127.0.0.1".to_string());
            let addr = format!("{}:{}", bind, server.port);
            let listener = match tokio::net::TcpListener::bind(addr).await {
                Ok(listener) => listener,
                Err(err) => {
                    tracing::error!("failed to bind server listener: {err}");
                    return;
                }
            };
            if let Err(err) = server::run_with_listener(engine, db, listener).await {
                tracing::error!("server failed: {err}");
            }
        });
    }

    while tasks.join_next().await.is_some() {
        tasks.shutdown().await;
    }

    Ok(())
}

async fn parse_database(
    config: &settings::Database,
) -> Result<DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}

/// Applies missed institutional installments for every user.
async fn sweep_installments(
    engine: &engine::Engine,
    db: &DatabaseConnection,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let rows = db
        .query_all(Statement::from_string(
            DbBackend::Sqlite,
            "SELECT username FROM users".to_string(),
        ))
        .await?;

    for row in rows {
        let username: String = row.try_get("", "username")?;
        match engine.catch_up_all(&username).await {
            Ok(report) => {
                let applied: u32 = report.outcomes.iter().map(|o| o.applied).sum();
                if applied > 0 {
                    tracing::info!("applied {applied} installments for {username}");
                }
                for (debt_id, err) in &report.failures {
                    tracing::error!("catch-up failed for {username} debt {debt_id}: {err}");
                }
            }
            Err(err) => tracing::error!("catch-up failed for {username}: {err}"),
        }
    }
    Ok(())
}
