// handlers/mod.rs - three security tiers
//
// Public (no auth) → Protected (JWT auth) → Admin (JWT + super_admin/country_admin)

pub mod admin;
pub mod protected;
pub mod public;

use serde::Deserialize;

use crate::services::VerificationError;

/// Integer that clients send either as a number or as a numeric string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LooseInt {
    Number(i64),
    Text(String),
}

impl LooseInt {
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            LooseInt::Number(n) => i32::try_from(*n).ok(),
            LooseInt::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Trimmed, non-empty text
pub(crate) fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Collects the names of missing required fields
#[derive(Debug, Default)]
pub(crate) struct RequiredFields {
    missing: Vec<String>,
}

impl RequiredFields {
    pub fn take(&mut self, value: Option<String>, field: &str) -> String {
        match present(value) {
            Some(value) => value,
            None => {
                self.missing.push(field.to_string());
                String::new()
            }
        }
    }

    pub fn check(&mut self, present: bool, field: &str) {
        if !present {
            self.missing.push(field.to_string());
        }
    }

    pub fn finish(self) -> Result<(), VerificationError> {
        if self.missing.is_empty() {
            Ok(())
        } else {
            Err(VerificationError::MissingFields(self.missing))
        }
    }
}
