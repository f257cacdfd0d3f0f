use clap::Args;

use hush_daemon::state::AppState;

#[derive(Args, Debug, Clone)]
pub struct Health;

const PROBES: [&str; 3] = ["livez", "readyz", "version"];

#[async_trait::async_trait]
impl crate::cli::op::Op for Health {
    type Error = std::convert::Infallible;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut lines = vec!["Config:".to_string()];
        match AppState::load(ctx.config_path.clone()) {
            Ok(state) => {
                lines.push(format!("  directory:   {}", state.hush_dir.display()));
                match state.load_keys() {
                    Ok(keys) => lines.push(format!("  keys:        {}", keys.len())),
                    Err(e) => lines.push(format!("  keys:        error: {}", e)),
                }
                lines.push(format!("  storage:     {}", state.storage()));
                lines.push(format!("  client_port: {}", state.config.client_port));
                lines.push(format!("  node_port:   {}", state.config.node_port));
            }
            Err(e) => lines.push(format!("  error: {}", e)),
        }

        let base = ctx.client.base_url();
        let client = ctx.client.http_client();
        lines.push(String::new());
        lines.push(format!("Daemon ({}):", base));

        for probe in PROBES {
            let url = format!("{}/_status/{}", base.as_str().trim_end_matches('/'), probe);
            let status = match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => "OK".to_string(),
                Ok(resp) => format!("UNHEALTHY ({})", resp.status()),
                Err(_) => "NOT REACHABLE".to_string(),
            };
            lines.push(format!("  {:<8}{}", format!("{}:", probe), status));
        }

        Ok(lines.join("\n"))
    }
}
