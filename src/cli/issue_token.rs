use std::time::Duration;

use anyhow::Context;
use sqlx::PgPool;

use crate::core::config::Config;
use crate::features::auth::JwtValidator;
use crate::features::users::UserService;

/// Sign a bearer token for `username` and print it to stdout
pub async fn run(config: &Config, pool: PgPool, username: &str, ttl_secs: Option<u64>) -> anyhow::Result<()> {
    let users = UserService::new(pool);
    let user = users
        .get_by_username(username)
        .await?
        .with_context(|| format!("user '{username}' does not exist"))?;
    anyhow::ensure!(user.is_active, "user '{}' is inactive", username);

    let validator = JwtValidator::new(&config.auth);
    let token = validator.issue(user.id, &user.username, ttl_secs.map(Duration::from_secs))?;

    tracing::info!("Issued token for {} ({})", user.display_name(), user.id);
    println!("{token}");
    Ok(())
}
