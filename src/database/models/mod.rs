pub mod business;
pub mod country;
pub mod driver;
pub mod otp;
pub mod sms;

pub use business::{BusinessProfile, BusinessVerification};
pub use country::Country;
pub use driver::{DriverProfile, DriverVerification};
pub use otp::{NewOtpChallenge, OtpChallenge};
pub use sms::{SmsAnalyticsTotal, SmsProviderConfigRow};
