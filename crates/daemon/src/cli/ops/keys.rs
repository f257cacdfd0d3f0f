use clap::Args;

use hush_daemon::http_server::api::client::ApiError;
use hush_daemon::http_server::api::v0::keys::{KeysRequest, KeysResponse};
use hush_daemon::state::{AppState, StateError};

#[derive(Args, Debug, Clone)]
pub struct Keys {
    /// Generate a new key pair as keys/<NAME>.pem. The daemon picks it up on restart.
    #[arg(long, value_name = "NAME")]
    pub generate: Option<String>,

    /// Ask the running daemon instead of reading the key directory
    #[arg(long, conflicts_with = "generate")]
    pub live: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum KeysError {
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Keys {
    type Error = KeysError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        if self.live {
            let response: KeysResponse = ctx.client.call(KeysRequest).await?;
            return Ok(format_keys(
                &response.default_key.to_string(),
                response.keys.iter().map(|k| k.to_string()),
            ));
        }

        let state = AppState::load(ctx.config_path.clone())?;
        if let Some(name) = &self.generate {
            let key = state.generate_key(name)?;
            return Ok(format!("Generated {}: {}", name, key.public()));
        }

        let publics: Vec<String> = state
            .load_keys()?
            .iter()
            .map(|k| k.public().to_string())
            .collect();
        let default_key = publics.first().cloned().unwrap_or_default();
        Ok(format_keys(&default_key, publics.into_iter()))
    }
}

fn format_keys(default_key: &str, keys: impl Iterator<Item = String>) -> String {
    keys.map(|key| {
        if key == default_key {
            format!("{} (default)", key)
        } else {
            key
        }
    })
    .collect::<Vec<_>>()
    .join("\n")
}
