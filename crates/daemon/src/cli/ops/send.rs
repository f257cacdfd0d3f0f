use std::path::PathBuf;

use clap::Args;

use common::crypto::PublicKey;
use common::enclave::PrivacyGroupId;
use hush_daemon::http_server::api::client::ApiError;
use hush_daemon::http_server::api::v0::send::{SendRequest, SendResponse};

#[derive(Args, Debug, Clone)]
pub struct SendPayload {
    /// Payload as text (or use --file)
    #[arg(long, group = "payload_source")]
    pub payload: Option<String>,

    /// Read the payload from a file (or use --payload)
    #[arg(long, group = "payload_source")]
    pub file: Option<PathBuf>,

    /// Sending key (defaults to the node's default key)
    #[arg(long)]
    pub from: Option<PublicKey>,

    /// Recipient public key (repeatable)
    #[arg(long, group = "recipients")]
    pub to: Vec<PublicKey>,

    /// Send to the members of a privacy group instead of --to
    #[arg(long, group = "recipients")]
    pub privacy_group_id: Option<PrivacyGroupId>,
}

#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error("failed to read payload file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Either --payload or --file must be provided")]
    NoPayload,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for SendPayload {
    type Error = SendError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let payload = match (&self.payload, &self.file) {
            (Some(text), _) => text.clone().into_bytes(),
            (None, Some(path)) => tokio::fs::read(path).await?,
            (None, None) => return Err(SendError::NoPayload),
        };

        let request = SendRequest {
            payload,
            from: self.from,
            to: self.to.clone(),
            privacy_group_id: self.privacy_group_id,
        };
        let response: SendResponse = ctx.client.call(request).await?;

        Ok(format!(
            "key: {}\nprivacy group: {}",
            response.key, response.privacy_group_id
        ))
    }
}
