use hush_daemon::http_server::api::client::ApiError;
use hush_daemon::http_server::api::v0::receive::{ReceiveRequest, ReceiveResponse};

#[async_trait::async_trait]
impl crate::cli::op::Op for ReceiveRequest {
    type Error = ApiError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let response: ReceiveResponse = ctx.client.call(self.clone()).await?;

        let mut output = match String::from_utf8(response.payload) {
            Ok(text) => text,
            Err(e) => hex(e.as_bytes()),
        };
        if let Some(id) = response.privacy_group_id {
            output.push_str(&format!("\nprivacy group: {}", id));
        }
        Ok(output)
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

pub type Receive = ReceiveRequest;
