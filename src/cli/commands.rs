use anyhow::Context;

use crate::auth::TokenService;
use crate::config::AppConfig;
use crate::database::{DatabaseManager, PgRepository, UserRepository};

pub async fn serve(mut config: AppConfig, port: Option<u16>) -> anyhow::Result<()> {
    if let Some(port) = port {
        config.server.port = port;
    }
    crate::server::serve(config).await
}

pub async fn migrate(config: AppConfig) -> anyhow::Result<()> {
    let database = DatabaseManager::connect(&config.database).await?;
    let result = database.migrate().await;
    database.close().await;
    result?;
    println!("Migrations applied");
    Ok(())
}

pub async fn token(config: AppConfig, username: &str) -> anyhow::Result<()> {
    let database = DatabaseManager::connect(&config.database).await?;
    let users = PgRepository::new(database.pool().clone());
    let user = users.find_by_username(username).await;
    database.close().await;

    let user = user?.with_context(|| format!("no user named '{}'", username))?;
    let tokens = TokenService::new(&config.security.jwt_secret, config.security.jwt_expiry_hours);
    println!("{}", tokens.issue(&user)?);
    Ok(())
}
