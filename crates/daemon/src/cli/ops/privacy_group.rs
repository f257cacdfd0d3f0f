use clap::{Args, Subcommand};

use crate::cli::op::Op;
use hush_daemon::http_server::api::client::ApiError;
use hush_daemon::http_server::api::v0::privacy_group::{
    CreateRequest, DeleteRequest, FindRequest, PrivacyGroupResponse,
};

crate::command_enum! {
    (Create, CreateRequest),
    (Find, FindRequest),
    (Delete, DeleteRequest),
}

pub type PrivacyGroupCommand = Command;

#[derive(Args, Debug, Clone)]
pub struct PrivacyGroup {
    #[command(subcommand)]
    pub command: PrivacyGroupCommand,
}

#[async_trait::async_trait]
impl Op for PrivacyGroup {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}

#[async_trait::async_trait]
impl Op for CreateRequest {
    type Error = ApiError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let response = ctx.client.call(self.clone()).await?;
        Ok(format!("Created privacy group\n{}", describe(&response)))
    }
}

#[async_trait::async_trait]
impl Op for FindRequest {
    type Error = ApiError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let response = ctx.client.call(self.clone()).await?;
        Ok(describe(&response))
    }
}

#[async_trait::async_trait]
impl Op for DeleteRequest {
    type Error = ApiError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let response = ctx.client.call(self.clone()).await?;
        Ok(format!("Deleted privacy group\n{}", describe(&response)))
    }
}

fn describe(response: &PrivacyGroupResponse) -> String {
    let group = &response.group;
    let mut lines = vec![
        format!("id:          {}", response.privacy_group_id),
        format!("type:        {}", group.group_type),
        format!("state:       {:?}", group.state),
    ];
    if !group.name.is_empty() {
        lines.push(format!("name:        {}", group.name));
    }
    if !group.description.is_empty() {
        lines.push(format!("description: {}", group.description));
    }
    lines.push("members:".to_string());
    lines.extend(group.addresses.iter().map(|key| format!("  {}", key)));
    lines.join("\n")
}
