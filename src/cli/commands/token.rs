use std::path::PathBuf;

use anyhow::{bail, Context};
use serde_json::json;

use crate::auth::{generate_jwt, Claims};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config;
use crate::types::{collections, Role};

use super::seed::{import, DEFAULT_FIXTURE_DIR};

pub async fn handle(user_id: String, dir: Option<PathBuf>, output_format: OutputFormat) -> anyhow::Result<()> {
    let config = config::config();
    let store = super::open_store(config).await?;

    // Without a database the user has to come from the fixtures the dev
    // server was seeded with
    if config.database.url.is_none() {
        let dir = dir.unwrap_or_else(|| PathBuf::from(DEFAULT_FIXTURE_DIR));
        import(store.as_ref(), &dir).await?;
    }

    let Some(user) = store.find_by_id(collections::USERS, &user_id).await? else {
        bail!("No user with the id of {}", user_id);
    };
    let role: Role = user
        .get_str("role")
        .unwrap_or("user")
        .parse()
        .map_err(anyhow::Error::msg)?;

    let claims = Claims::new(user_id.clone(), role, config.security.jwt_expiry_hours);
    let token = generate_jwt(&claims, &config.security.jwt_secret).context("signing token")?;

    match output_format {
        OutputFormat::Text => {
            println!("{}", token);
            Ok(())
        }
        OutputFormat::Json => output_success(
            &output_format,
            &format!("Issued token for {} ({})", user_id, role),
            Some(json!({ "token": token, "expires": claims.exp })),
        ),
    }
}
