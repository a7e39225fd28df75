use crate::cli::utils::{connect, output_success};
use crate::cli::OutputFormat;
use crate::config::config;

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let db = connect(config()).await?;
    db.migrate()
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;
    db.close().await;

    output_success(&output_format, "Migrations applied", None)
}
