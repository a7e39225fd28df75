use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::services::VerificationError;
use crate::types::{ContactKind, ReviewStatus};

/// Which verification table a request lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationKind {
    Business,
    Driver,
}

impl VerificationKind {
    pub fn table(&self) -> &'static str {
        match self {
            VerificationKind::Business => "business_verifications",
            VerificationKind::Driver => "driver_verifications",
        }
    }

    pub fn documents(&self) -> &'static [DocumentType] {
        match self {
            VerificationKind::Business => BUSINESS_DOCUMENTS,
            VerificationKind::Driver => DRIVER_DOCUMENTS,
        }
    }

    /// Role granted in `users.roles` once a request is fully verified
    pub fn granted_role(&self) -> &'static str {
        match self {
            VerificationKind::Business => "business",
            VerificationKind::Driver => "driver",
        }
    }

    /// `purpose` tag for professional contacts verified in this flow
    pub fn contact_purpose(&self) -> &'static str {
        match self {
            VerificationKind::Business => "business_verification",
            VerificationKind::Driver => "driver_verification",
        }
    }

    /// Column holding the contact submitted with the request
    pub fn contact_column(&self, contact: ContactKind) -> &'static str {
        match (self, contact) {
            (VerificationKind::Business, ContactKind::Phone) => "business_phone",
            (VerificationKind::Business, ContactKind::Email) => "business_email",
            (VerificationKind::Driver, ContactKind::Phone) => "phone_number",
            (VerificationKind::Driver, ContactKind::Email) => "email",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            VerificationKind::Business => "Business verification",
            VerificationKind::Driver => "Driver verification",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentType {
    BusinessLogo,
    BusinessLicense,
    InsuranceDocument,
    TaxCertificate,
    DriverImage,
    NicFront,
    NicBack,
    LicenseFront,
    LicenseBack,
    VehicleRegistration,
    VehicleInsurance,
    BillingProof,
}

const BUSINESS_DOCUMENTS: &[DocumentType] = &[
    DocumentType::BusinessLogo,
    DocumentType::BusinessLicense,
    DocumentType::InsuranceDocument,
    DocumentType::TaxCertificate,
];

const DRIVER_DOCUMENTS: &[DocumentType] = &[
    DocumentType::DriverImage,
    DocumentType::NicFront,
    DocumentType::NicBack,
    DocumentType::LicenseFront,
    DocumentType::LicenseBack,
    DocumentType::VehicleRegistration,
    DocumentType::VehicleInsurance,
    DocumentType::BillingProof,
];

impl DocumentType {
    /// Column prefix: `<prefix>_url`, `<prefix>_status`, `<prefix>_rejection_reason`
    pub fn column_prefix(&self) -> &'static str {
        match self {
            DocumentType::BusinessLogo => "business_logo",
            DocumentType::BusinessLicense => "business_license",
            DocumentType::InsuranceDocument => "insurance_document",
            DocumentType::TaxCertificate => "tax_certificate",
            DocumentType::DriverImage => "driver_image",
            DocumentType::NicFront => "nic_front",
            DocumentType::NicBack => "nic_back",
            DocumentType::LicenseFront => "license_front",
            DocumentType::LicenseBack => "license_back",
            DocumentType::VehicleRegistration => "vehicle_registration",
            DocumentType::VehicleInsurance => "vehicle_insurance",
            DocumentType::BillingProof => "billing_proof",
        }
    }

    pub fn kind(&self) -> VerificationKind {
        if BUSINESS_DOCUMENTS.contains(self) {
            VerificationKind::Business
        } else {
            VerificationKind::Driver
        }
    }

    /// Parse a path segment such as `businessLogo` or `business_logo` for the given kind
    pub fn parse(kind: VerificationKind, raw: &str) -> Result<Self, VerificationError> {
        let mut snake = String::with_capacity(raw.len() + 4);
        for c in raw.trim().chars() {
            if c.is_ascii_uppercase() {
                if !snake.is_empty() {
                    snake.push('_');
                }
                snake.push(c.to_ascii_lowercase());
            } else if c == '-' {
                snake.push('_');
            } else {
                snake.push(c);
            }
        }

        kind.documents()
            .iter()
            .copied()
            .find(|doc| doc.column_prefix() == snake)
            .ok_or_else(|| VerificationError::InvalidDocumentType(raw.to_string()))
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_prefix())
    }
}

/// One uploaded document and its review outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentState {
    pub document: DocumentType,
    pub url: Option<String>,
    pub status: Option<ReviewStatus>,
    pub rejection_reason: Option<String>,
}

impl DocumentState {
    pub fn empty(document: DocumentType) -> Self {
        Self {
            document,
            url: None,
            status: None,
            rejection_reason: None,
        }
    }

    /// State after the applicant (re)submits `url` for this document.
    ///
    /// A new or changed upload goes back to review, an unchanged one keeps its
    /// outcome and a removed one stops counting.
    pub fn resubmitted(
        previous: Option<&DocumentState>,
        document: DocumentType,
        url: Option<String>,
    ) -> Self {
        let url = url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty());

        match (previous, url) {
            (_, None) => DocumentState::empty(document),
            (Some(prev), Some(url)) if prev.url.as_deref() == Some(url.as_str()) => DocumentState {
                document,
                status: prev.status.or(Some(ReviewStatus::Pending)),
                rejection_reason: prev.rejection_reason.clone(),
                url: Some(url),
            },
            (_, Some(url)) => DocumentState {
                document,
                url: Some(url),
                status: Some(ReviewStatus::Pending),
                rejection_reason: None,
            },
        }
    }
}

/// The review-relevant part of a verification row, read under a row lock
#[derive(Debug, Clone)]
pub struct ReviewSnapshot {
    pub id: i64,
    pub user_id: Uuid,
    pub kind: VerificationKind,
    pub country: String,
    pub status: ReviewStatus,
    pub phone_verified: bool,
    pub email_verified: bool,
    pub is_verified: bool,
    pub approved_at: Option<DateTime<Utc>>,
    pub documents: Vec<DocumentState>,
}

impl ReviewSnapshot {
    /// Approved overall, both contacts verified, and no present document short of approved
    pub fn derive_is_verified(&self) -> bool {
        self.status == ReviewStatus::Approved
            && self.phone_verified
            && self.email_verified
            && self
                .documents
                .iter()
                .all(|doc| matches!(doc.status, None | Some(ReviewStatus::Approved)))
    }

    pub fn document(&self, document: DocumentType) -> Option<&DocumentState> {
        self.documents.iter().find(|d| d.document == document)
    }

    pub fn set_document_status(
        &mut self,
        document: DocumentType,
        status: ReviewStatus,
        rejection_reason: Option<String>,
    ) -> Result<(), VerificationError> {
        if document.kind() != self.kind {
            return Err(VerificationError::InvalidDocumentType(document.to_string()));
        }

        let index = match self.documents.iter().position(|d| d.document == document) {
            Some(index) => index,
            None => {
                self.documents.push(DocumentState::empty(document));
                self.documents.len() - 1
            }
        };

        let entry = &mut self.documents[index];
        entry.status = Some(status);
        entry.rejection_reason = match status {
            ReviewStatus::Rejected => rejection_reason
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty()),
            ReviewStatus::Approved | ReviewStatus::Pending => None,
        };
        Ok(())
    }

    /// Re-derive `is_verified`; returns true when this call flipped it on.
    ///
    /// `approved_at` is stamped on the first flip only.
    pub fn recompute(&mut self, now: DateTime<Utc>) -> bool {
        let was_verified = self.is_verified;
        self.is_verified = self.derive_is_verified();

        let newly_verified = self.is_verified && !was_verified;
        if newly_verified && self.approved_at.is_none() {
            self.approved_at = Some(now);
        }
        newly_verified
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn snapshot(kind: VerificationKind) -> ReviewSnapshot {
        ReviewSnapshot {
            id: 1,
            user_id: Uuid::new_v4(),
            kind,
            country: "LK".into(),
            status: ReviewStatus::Pending,
            phone_verified: false,
            email_verified: false,
            is_verified: false,
            approved_at: None,
            documents: kind
                .documents()
                .iter()
                .map(|d| DocumentState::empty(*d))
                .collect(),
        }
    }

    fn fully_verified() -> ReviewSnapshot {
        let mut s = snapshot(VerificationKind::Business);
        s.status = ReviewStatus::Approved;
        s.phone_verified = true;
        s.email_verified = true;
        s.set_document_status(DocumentType::BusinessLicense, ReviewStatus::Approved, None)
            .unwrap();
        s
    }

    #[test]
    fn document_types_parse_camel_and_snake_case() {
        let kind = VerificationKind::Business;
        assert_eq!(DocumentType::parse(kind, "businessLogo").unwrap(), DocumentType::BusinessLogo);
        assert_eq!(
            DocumentType::parse(kind, "tax_certificate").unwrap(),
            DocumentType::TaxCertificate
        );
        assert!(DocumentType::parse(kind, "nicFront").is_err());
        assert!(DocumentType::parse(kind, "passport").is_err());
        assert_eq!(
            DocumentType::parse(VerificationKind::Driver, "vehicleRegistration").unwrap(),
            DocumentType::VehicleRegistration
        );
    }

    #[test]
    fn absent_documents_do_not_block_verification() {
        let mut s = fully_verified();
        assert!(s.recompute(Utc::now()));
        assert!(s.is_verified);
        assert!(s.approved_at.is_some());
    }

    #[test]
    fn any_single_input_flipping_clears_is_verified() {
        let flips: Vec<Box<dyn Fn(&mut ReviewSnapshot)>> = vec![
            Box::new(|s| s.status = ReviewStatus::Pending),
            Box::new(|s| s.status = ReviewStatus::Rejected),
            Box::new(|s| s.phone_verified = false),
            Box::new(|s| s.email_verified = false),
            Box::new(|s| {
                s.set_document_status(
                    DocumentType::BusinessLicense,
                    ReviewStatus::Rejected,
                    Some("blurry".into()),
                )
                .unwrap()
            }),
            Box::new(|s| {
                s.set_document_status(DocumentType::TaxCertificate, ReviewStatus::Pending, None)
                    .unwrap()
            }),
        ];

        for flip in flips {
            let mut s = fully_verified();
            s.recompute(Utc::now());
            assert!(s.is_verified);

            flip(&mut s);
            s.recompute(Utc::now());
            assert!(!s.is_verified);
        }
    }

    #[test]
    fn approved_at_is_stamped_once() {
        let mut s = fully_verified();
        let first = Utc::now() - Duration::days(1);
        assert!(s.recompute(first));
        assert_eq!(s.approved_at, Some(first));

        // idempotent repeat
        s.set_document_status(DocumentType::BusinessLicense, ReviewStatus::Approved, None)
            .unwrap();
        assert!(!s.recompute(Utc::now()));
        assert_eq!(s.approved_at, Some(first));

        // revoke and re-approve
        s.status = ReviewStatus::Rejected;
        s.recompute(Utc::now());
        s.status = ReviewStatus::Approved;
        assert!(s.recompute(Utc::now()));
        assert_eq!(s.approved_at, Some(first));
    }

    #[test]
    fn approving_or_resetting_clears_rejection_reason() {
        let mut s = snapshot(VerificationKind::Business);
        let doc = DocumentType::BusinessLogo;

        s.set_document_status(doc, ReviewStatus::Rejected, Some("low resolution".into()))
            .unwrap();
        assert_eq!(s.document(doc).unwrap().rejection_reason.as_deref(), Some("low resolution"));

        s.set_document_status(doc, ReviewStatus::Approved, Some("ignored".into()))
            .unwrap();
        assert_eq!(s.document(doc).unwrap().rejection_reason, None);

        s.set_document_status(doc, ReviewStatus::Rejected, Some("expired".into()))
            .unwrap();
        s.set_document_status(doc, ReviewStatus::Pending, None).unwrap();
        assert_eq!(s.document(doc).unwrap().rejection_reason, None);
    }

    #[test]
    fn foreign_document_type_is_rejected() {
        let mut s = snapshot(VerificationKind::Driver);
        assert!(s
            .set_document_status(DocumentType::BusinessLogo, ReviewStatus::Approved, None)
            .is_err());
    }

    #[test]
    fn resubmission_resets_only_changed_documents() {
        let doc = DocumentType::NicFront;
        let approved = DocumentState {
            document: doc,
            url: Some("https://files/nic-1.jpg".into()),
            status: Some(ReviewStatus::Approved),
            rejection_reason: None,
        };

        let url = Some("https://files/nic-1.jpg".to_string());
        let same = DocumentState::resubmitted(Some(&approved), doc, url);
        assert_eq!(same.status, Some(ReviewStatus::Approved));

        let rejected = DocumentState {
            status: Some(ReviewStatus::Rejected),
            rejection_reason: Some("cropped".into()),
            ..approved.clone()
        };
        let url = Some("https://files/nic-2.jpg".to_string());
        let changed = DocumentState::resubmitted(Some(&rejected), doc, url);
        assert_eq!(changed.status, Some(ReviewStatus::Pending));
        assert_eq!(changed.rejection_reason, None);

        let removed = DocumentState::resubmitted(Some(&approved), doc, Some("  ".into()));
        assert_eq!(removed, DocumentState::empty(doc));

        let fresh = DocumentState::resubmitted(None, doc, Some("https://files/nic-3.jpg".into()));
        assert_eq!(fresh.status, Some(ReviewStatus::Pending));
    }
}
