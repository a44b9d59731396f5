use clap::Args;

use burrow_daemon::state::AppState;

#[derive(Args, Debug, Clone)]
pub struct Health;

#[derive(Debug, thiserror::Error)]
pub enum HealthError {
    #[error("Health check failed: {0}")]
    Failed(String),
}

/// Probe one status endpoint, reducing the outcome to a report word.
async fn probe(client: &reqwest::Client, url: String) -> String {
    match client.get(&url).send().await {
        Ok(resp) if resp.status().is_success() => "OK".to_string(),
        Ok(resp) => format!("UNHEALTHY ({})", resp.status()),
        Err(_) => "NOT REACHABLE".to_string(),
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Health {
    type Error = HealthError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut lines = Vec::new();

        lines.push("Config:".to_string());
        match AppState::load(ctx.config_path.clone()) {
            Ok(state) => {
                lines.push(format!("  directory:   {}", state.burrow_dir.display()));
                lines.push("  config.toml: OK".to_string());
                if state.db_path.exists() {
                    lines.push("  db.sqlite:   OK".to_string());
                } else {
                    lines.push("  db.sqlite:   missing (created on first daemon run)".to_string());
                }
                lines.push(format!("  port:        {}", state.config.port));
            }
            Err(e) => lines.push(format!("  error: {}", e)),
        }

        let base = ctx.client.base_url();
        let client = ctx.client.http_client();
        let root = base.as_str().trim_end_matches('/');

        lines.push(String::new());
        lines.push(format!("Daemon ({}):", base));
        lines.push(format!(
            "  livez:  {}",
            probe(client, format!("{}/_status/livez", root)).await
        ));
        lines.push(format!(
            "  readyz: {}",
            probe(client, format!("{}/_status/readyz", root)).await
        ));

        Ok(lines.join("\n"))
    }
}
