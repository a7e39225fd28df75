pub mod clock;
pub mod contact_resolver;
pub mod country_directory;
pub mod document_review;
pub mod otp;
pub mod phone;
pub mod verification;

use thiserror::Error;

use crate::database::manager::DatabaseError;

pub use clock::{Clock, SystemClock};
pub use contact_resolver::{ContactResolver, ContactStore, ContactVerification, VerificationSource};
pub use country_directory::CountryDirectory;
pub use document_review::{DocumentType, ReviewSnapshot, VerificationKind};
pub use otp::{OtpDispatch, OtpError, OtpService, OtpStore};
pub use verification::{VerificationRecord, VerificationService};

/// Errors from the verification workflow
#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("{0}")]
    UnknownCountry(String),

    #[error("Invalid document type '{0}'")]
    InvalidDocumentType(String),

    #[error("{0}")]
    InvalidStatus(String),

    #[error("Verification not found")]
    NotFound,

    #[error("Access denied to country {0}")]
    OutOfScope(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for VerificationError {
    fn from(err: sqlx::Error) -> Self {
        VerificationError::Database(err.into())
    }
}
