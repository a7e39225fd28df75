use clap::Args;
use serde_json::json;

use crate::cli::utils::{connect, output_error, output_success};
use crate::cli::OutputFormat;
use crate::config::config;
use crate::database::repository::sms_config;
use crate::database::scope::canonical_country_code;
use crate::services::phone::to_international;
use crate::services::CountryDirectory;
use crate::sms::{SmsRegistry, SmsSender};

#[derive(Debug, Args)]
pub struct SmsTestArgs {
    #[arg(long, help = "ISO country code whose provider is used")]
    pub country: String,

    #[arg(long, help = "Destination number, local or international")]
    pub to: String,

    #[arg(long, default_value = "Test message from the marketplace CLI")]
    pub message: String,
}

pub async fn handle(args: SmsTestArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let config = config();
    let country = canonical_country_code(&args.country)
        .ok_or_else(|| anyhow::anyhow!("Invalid country code '{}'", args.country))?;

    let db = connect(config).await?;
    let registry = SmsRegistry::new();
    registry.reload(db.pool()).await?;

    let directory = CountryDirectory::new(db.pool().clone(), &config.verification);
    let prefix = directory.dialing_prefix(&country).await?;
    let to = to_international(&args.to, &prefix);

    let provider = registry.provider_for(&country).await?;
    let outcome = provider.send_sms(&to, &args.message).await;

    let success = outcome.is_ok();
    let cost = outcome.as_ref().map(|r| r.cost).unwrap_or(0.0);
    if let Err(e) =
        sms_config::record_delivery(db.pool(), &country, provider.name(), cost, success).await
    {
        tracing::warn!("Failed to record SMS analytics: {}", e);
    }
    db.close().await;

    match outcome {
        Ok(receipt) => output_success(
            &output_format,
            &format!("Sent test SMS to {} via {}", to, receipt.provider),
            Some(json!({
                "messageId": receipt.message_id,
                "provider": receipt.provider,
                "cost": receipt.cost,
            })),
        ),
        Err(e) => {
            output_error(&output_format, &e.to_string(), Some("SMS_FAILED"))?;
            Err(e.into())
        }
    }
}
