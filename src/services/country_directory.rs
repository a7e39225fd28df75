use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::LookupCache;
use crate::config::VerificationConfig;
use crate::database::models::Country;
use crate::database::repository::country;
use crate::database::scope::canonical_country_code;
use crate::services::phone::default_dialing_prefix;
use crate::services::VerificationError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CountryKey {
    Code(String),
    Id(i32),
}

/// Known countries, read through a bounded cache
#[derive(Clone)]
pub struct CountryDirectory {
    pool: PgPool,
    cache: Arc<LookupCache<CountryKey, Country>>,
    default_country: String,
}

impl CountryDirectory {
    pub fn new(pool: PgPool, config: &VerificationConfig) -> Self {
        Self {
            pool,
            cache: Arc::new(LookupCache::new(
                config.country_cache_capacity,
                Duration::from_secs(config.country_cache_ttl_secs),
            )),
            default_country: config.default_country.clone(),
        }
    }

    fn remember(&self, country: &Country) {
        self.cache
            .insert(CountryKey::Code(country.code.to_uppercase()), country.clone());
        self.cache.insert(CountryKey::Id(country.id), country.clone());
    }

    /// Active country by code; `None` when unknown or inactive
    pub async fn by_code(&self, code: &str) -> Result<Option<Country>, VerificationError> {
        let Some(code) = canonical_country_code(code) else {
            return Ok(None);
        };

        if let Some(hit) = self.cache.get(&CountryKey::Code(code.clone())) {
            return Ok(Some(hit));
        }

        let found = country::find_by_code(&self.pool, &code).await?;
        let found = found.filter(|c| c.is_active);
        if let Some(country) = &found {
            self.remember(country);
        }
        Ok(found)
    }

    pub async fn by_id(&self, id: i32) -> Result<Option<Country>, VerificationError> {
        if let Some(hit) = self.cache.get(&CountryKey::Id(id)) {
            return Ok(Some(hit));
        }

        let found = country::find_by_id(&self.pool, id).await?;
        let found = found.filter(|c| c.is_active);
        if let Some(country) = &found {
            self.remember(country);
        }
        Ok(found)
    }

    /// Resolve a submission's country from a code, else from a country id
    pub async fn resolve(
        &self,
        code: Option<&str>,
        id: Option<i32>,
    ) -> Result<Country, VerificationError> {
        if let Some(code) = code.map(str::trim).filter(|c| !c.is_empty()) {
            return self
                .by_code(code)
                .await?
                .ok_or_else(|| {
                    VerificationError::UnknownCountry(format!("Unknown country '{}'", code))
                });
        }

        if let Some(id) = id {
            return self
                .by_id(id)
                .await?
                .ok_or_else(|| {
                    VerificationError::UnknownCountry(format!("Unknown country id {}", id))
                });
        }

        Err(VerificationError::MissingFields(vec!["country".to_string()]))
    }

    /// Dialing prefix for `code`, falling back to the built-in table, then the default country
    pub async fn dialing_prefix(&self, code: &str) -> Result<String, VerificationError> {
        if let Some(country) = self.by_code(code).await? {
            return Ok(country.phone_prefix.trim_start_matches('+').to_string());
        }
        Ok(default_dialing_prefix(code)
            .or_else(|| default_dialing_prefix(&self.default_country))
            .unwrap_or("94")
            .to_string())
    }
}
