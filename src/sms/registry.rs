use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{ProviderConfig, SmsError, SmsProvider, SmsSender};
use crate::database::manager::DatabaseError;
use crate::database::models::SmsProviderConfigRow;
use crate::database::repository::sms_config;

/// Loaded state of one country's provider
#[derive(Clone)]
pub enum ProviderSlot {
    Ready(Arc<SmsProvider>),
    Misconfigured { provider: String, reason: String },
}

/// Per-country SMS providers, built once when configuration is loaded
#[derive(Clone, Default)]
pub struct SmsRegistry {
    slots: Arc<RwLock<HashMap<String, ProviderSlot>>>,
}

impl SmsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild every slot from the active rows in `sms_provider_configs`
    pub async fn reload(&self, pool: &sqlx::PgPool) -> Result<usize, DatabaseError> {
        let rows = sms_config::list_active(pool).await?;
        Ok(self.replace_all(rows).await)
    }

    /// Replace all slots. Rows are expected newest first; the first row per country wins.
    pub async fn replace_all(&self, rows: Vec<SmsProviderConfigRow>) -> usize {
        let mut slots = HashMap::new();

        for row in rows {
            if !row.is_active || slots.contains_key(&row.country_code) {
                continue;
            }

            let slot = match ProviderConfig::from_parts(&row.provider, row.config.clone())
                .and_then(|config| config.build())
            {
                Ok(provider) => ProviderSlot::Ready(Arc::new(provider)),
                Err(e) => {
                    tracing::warn!(
                        "SMS provider '{}' for {} is misconfigured: {}",
                        row.provider,
                        row.country_code,
                        e
                    );
                    ProviderSlot::Misconfigured {
                        provider: row.provider.clone(),
                        reason: e.to_string(),
                    }
                }
            };
            slots.insert(row.country_code.clone(), slot);
        }

        let count = slots.len();
        *self.slots.write().await = slots;
        tracing::info!("Loaded SMS providers for {} countries", count);
        count
    }

    pub async fn insert(&self, country: &str, config: &ProviderConfig) -> Result<(), SmsError> {
        let provider = config.build()?;
        self.slots
            .write()
            .await
            .insert(country.to_string(), ProviderSlot::Ready(Arc::new(provider)));
        Ok(())
    }

    pub async fn provider_for(&self, country: &str) -> Result<Arc<SmsProvider>, SmsError> {
        match self.slots.read().await.get(country) {
            Some(ProviderSlot::Ready(provider)) => Ok(provider.clone()),
            Some(ProviderSlot::Misconfigured { provider, reason }) => Err(SmsError::Misconfigured {
                country: country.to_string(),
                reason: format!("{}: {}", provider, reason),
            }),
            None => Err(SmsError::NotConfigured(country.to_string())),
        }
    }

    /// `(country, provider, ready)` for every loaded slot
    pub async fn summary(&self) -> Vec<(String, String, bool)> {
        let mut summary: Vec<_> = self
            .slots
            .read()
            .await
            .iter()
            .map(|(country, slot)| match slot {
                ProviderSlot::Ready(p) => (country.clone(), p.name().to_string(), true),
                ProviderSlot::Misconfigured { provider, .. } => {
                    (country.clone(), provider.clone(), false)
                }
            })
            .collect();
        summary.sort();
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn row(country: &str, provider: &str, config: serde_json::Value) -> SmsProviderConfigRow {
        SmsProviderConfigRow {
            id: 0,
            country_code: country.into(),
            provider: provider.into(),
            config,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn broken_rows_are_kept_as_misconfigured() {
        let registry = SmsRegistry::new();
        registry
            .replace_all(vec![
                row("LK", "local", json!({"logOnly": true})),
                row("IN", "twilio", json!({"accountSid": "AC1"})),
            ])
            .await;

        assert_eq!(registry.provider_for("LK").await.unwrap().name(), "local");
        assert!(matches!(
            registry.provider_for("IN").await,
            Err(SmsError::Misconfigured { .. })
        ));
        assert!(matches!(
            registry.provider_for("US").await,
            Err(SmsError::NotConfigured(_))
        ));
    }

    #[tokio::test]
    async fn first_row_per_country_wins() {
        let registry = SmsRegistry::new();
        registry
            .replace_all(vec![
                row("LK", "local", json!({"logOnly": true})),
                row("LK", "hutch_mobile", json!({"username": "u", "password": "p"})),
            ])
            .await;
        assert_eq!(registry.provider_for("LK").await.unwrap().name(), "local");
        assert_eq!(registry.summary().await.len(), 1);
    }
}
