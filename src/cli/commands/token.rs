use clap::Args;
use serde_json::json;
use uuid::Uuid;

use crate::auth::{issue_token, Claims, Role};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::config;
use crate::database::scope::canonical_country_code;

#[derive(Debug, Args)]
pub struct TokenArgs {
    #[arg(long, help = "Subject user id (random when omitted)")]
    pub user_id: Option<Uuid>,

    #[arg(long, default_value = "user", help = "super_admin, country_admin or user")]
    pub role: String,

    #[arg(long, help = "Country assignment for country admins")]
    pub country: Option<String>,

    #[arg(long, help = "Email claim")]
    pub email: Option<String>,

    #[arg(long, help = "Lifetime in hours (defaults to the configured expiry)")]
    pub hours: Option<u64>,
}

pub fn handle(args: TokenArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let config = config();
    let role = Role::parse(&args.role);

    let country = match args.country.as_deref() {
        Some(raw) => Some(
            canonical_country_code(raw)
                .ok_or_else(|| anyhow::anyhow!("Invalid country code '{}'", raw))?,
        ),
        None => None,
    };
    if role == Role::CountryAdmin && country.is_none() {
        anyhow::bail!("country_admin tokens need --country");
    }

    let user_id = args.user_id.unwrap_or_else(Uuid::new_v4);
    let hours = args.hours.unwrap_or(config.security.jwt_expiry_hours);
    let mut claims = Claims::new(user_id, role, country.clone(), hours);
    if let Some(email) = args.email {
        claims = claims.with_email(email);
    }

    let token = issue_token(&claims, &config.security.jwt_secret)?;

    match output_format {
        OutputFormat::Text => {
            println!("{}", token);
            Ok(())
        }
        OutputFormat::Json => output_success(
            &output_format,
            "Token issued",
            Some(json!({
                "token": token,
                "userId": user_id,
                "role": role.as_str(),
                "countryCode": country,
                "expiresInHours": hours,
            })),
        ),
    }
}
