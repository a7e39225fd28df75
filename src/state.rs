use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::repository::otp::PgOtpStore;
use crate::database::DatabaseManager;
use crate::email::EmailChannel;
use crate::services::{CountryDirectory, OtpService, VerificationService};
use crate::sms::SmsRegistry;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseManager,
    pub sms: SmsRegistry,
    pub email: EmailChannel,
    pub countries: CountryDirectory,
    pub verifications: VerificationService,
    pub otp: Arc<OtpService<PgOtpStore>>,
}

impl AppState {
    /// Wire services over an open pool. Providers are loaded by [`AppState::load_providers`].
    pub fn new(config: Arc<AppConfig>, db: DatabaseManager) -> Self {
        let pool = db.pool().clone();
        let sms = SmsRegistry::new();
        let email = EmailChannel::from_config(&config.email);

        let otp = OtpService::new(
            PgOtpStore::new(pool.clone()),
            sms.clone(),
            email.clone(),
            config.otp.clone(),
            config.is_production(),
        );

        Self {
            countries: CountryDirectory::new(pool.clone(), &config.verification),
            verifications: VerificationService::new(pool),
            otp: Arc::new(otp),
            config,
            db,
            sms,
            email,
        }
    }

    pub async fn load_providers(&self) -> Result<usize, crate::database::DatabaseError> {
        self.sms.reload(self.db.pool()).await
    }
}
