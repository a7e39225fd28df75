mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn submission_creates_then_updates_one_row() -> Result<()> {
    let Some(app) = common::test_app().await? else {
        return Ok(());
    };
    let phone = common::fresh_lk_mobile();
    let (user_id, token) = app.user(Some(&common::international(&phone)), None).await?;

    let body = json!({
        "businessName": "Lanka Traders",
        "businessEmail": common::fresh_email(),
        "businessPhone": phone,
        "country": "lk",
        "businessLicenseUrl": "https://cdn.example/license-v1.pdf",
    });
    let (status, created) = app
        .post("/api/business-verifications", Some(&token), body.clone())
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    let data = &created["data"];
    assert_eq!(data["userId"], user_id.to_string());
    assert_eq!(data["country"], "LK");
    assert_eq!(data["countryName"], "Sri Lanka");
    assert_eq!(data["status"], "pending");
    assert_eq!(data["businessLicenseStatus"], "pending");
    assert_eq!(data["businessLogoStatus"], serde_json::Value::Null);
    assert_eq!(data["isVerified"], false);
    // registration phone matches but was never verified
    assert_eq!(data["verification"]["phone"]["verified"], false);
    assert_eq!(data["verification"]["phone"]["requiresManualVerification"], true);

    let mut resubmission = body;
    resubmission["businessName"] = json!("Lanka Traders (Pvt) Ltd");
    let (status, updated) = app
        .post("/api/business-verifications", Some(&token), resubmission)
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", updated);
    assert_eq!(updated["data"]["id"], data["id"]);
    assert_eq!(updated["data"]["businessName"], "Lanka Traders (Pvt) Ltd");

    let (status, own) = app
        .get(&format!("/api/business-verifications/user/{}", user_id), &token)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(own["data"]["requiresPhoneVerification"], true);
    assert_eq!(own["data"]["requiresEmailVerification"], true);
    Ok(())
}

#[tokio::test]
async fn missing_fields_and_unknown_country_are_rejected() -> Result<()> {
    let Some(app) = common::test_app().await? else {
        return Ok(());
    };
    let (_, token) = app.user(None, None).await?;

    let (status, body) = app
        .post(
            "/api/business-verifications",
            Some(&token),
            json!({ "businessName": "Only a name" }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["message"].as_str().unwrap_or_default();
    for field in ["business_email", "business_phone", "country"] {
        assert!(message.contains(field), "{} missing from {}", field, message);
    }

    let (status, _) = app
        .post(
            "/api/business-verifications",
            Some(&token),
            json!({
                "businessName": "Nowhere Ltd",
                "businessEmail": common::fresh_email(),
                "businessPhone": "0771234567",
                "country": "ZZ",
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post("/api/business-verifications", None, json!({}))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn review_drives_is_verified_and_resubmission_resets_changed_documents() -> Result<()> {
    let Some(app) = common::test_app().await? else {
        return Ok(());
    };
    let (user_id, token) = app.user(None, None).await?;
    let admin = app.super_admin();

    let body = json!({
        "businessName": "Review Co",
        "businessEmail": common::fresh_email(),
        "businessPhone": common::fresh_lk_mobile(),
        "country": "LK",
        "businessLicenseUrl": "https://cdn.example/license-v1.pdf",
        "taxCertificateUrl": "https://cdn.example/tax-v1.pdf",
    });
    let (_, created) = app
        .post("/api/business-verifications", Some(&token), body.clone())
        .await?;
    let id = created["data"]["id"].as_i64().expect("id");
    let base = format!("/api/business-verifications/{}", id);

    let (status, rejected) = app
        .put(
            &format!("{}/documents/businessLicense", base),
            &admin,
            json!({ "status": "rejected", "rejectionReason": "Blurry scan" }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", rejected);
    assert_eq!(rejected["data"]["businessLicenseRejectionReason"], "Blurry scan");

    for doc in ["business_license", "tax_certificate"] {
        let (status, _) = app
            .put(
                &format!("{}/documents/{}", base, doc),
                &admin,
                json!({ "status": "approved" }),
            )
            .await?;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, approved) = app
        .put(
            &format!("{}/status", base),
            &admin,
            json!({ "status": "approved", "phoneVerified": true, "emailVerified": true }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", approved);
    let data = &approved["data"];
    assert_eq!(data["businessLicenseRejectionReason"], serde_json::Value::Null);
    assert_eq!(data["isVerified"], true);
    let approved_at = data["approvedAt"].clone();
    assert!(approved_at.is_string());

    let roles: serde_json::Value = sqlx::query_scalar("SELECT roles FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_one(app.pool())
        .await?;
    assert!(roles.as_array().unwrap().iter().any(|r| r == "business"));

    // idempotent document write keeps the first approval stamp
    let (_, again) = app
        .put(
            &format!("{}/document-status", base),
            &admin,
            json!({ "documentType": "taxCertificate", "status": "approved" }),
        )
        .await?;
    assert_eq!(again["data"]["approvedAt"], approved_at);

    let mut resubmission = body;
    resubmission["businessLicenseUrl"] = json!("https://cdn.example/license-v2.pdf");
    let (_, resubmitted) = app
        .post("/api/business-verifications", Some(&token), resubmission)
        .await?;
    let data = &resubmitted["data"];
    assert_eq!(data["status"], "pending");
    assert_eq!(data["businessLicenseStatus"], "pending");
    assert_eq!(data["taxCertificateStatus"], "approved");
    assert_eq!(data["isVerified"], false);
    assert_eq!(data["approvedAt"], approved_at);
    Ok(())
}

#[tokio::test]
async fn invalid_review_input_is_rejected() -> Result<()> {
    let Some(app) = common::test_app().await? else {
        return Ok(());
    };
    let (_, token) = app.user(None, None).await?;
    let admin = app.super_admin();

    let (_, created) = app
        .post(
            "/api/business-verifications",
            Some(&token),
            json!({
                "businessName": "Bad Input Co",
                "businessEmail": common::fresh_email(),
                "businessPhone": common::fresh_lk_mobile(),
                "country": "LK",
            }),
        )
        .await?;
    let id = created["data"]["id"].as_i64().expect("id");

    let (status, _) = app
        .put(
            &format!("/api/business-verifications/{}/status", id),
            &admin,
            json!({ "status": "done" }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .put(
            &format!("/api/business-verifications/{}/documents/nic_front", id),
            &admin,
            json!({ "status": "approved" }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .put(
            "/api/business-verifications/999999999/status",
            &admin,
            json!({ "status": "approved" }),
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .put(
            &format!("/api/business-verifications/{}/status", id),
            &token,
            json!({ "status": "approved" }),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

async fn verify_phone(
    app: &common::TestApp,
    token: &str,
    phone: &str,
) -> Result<serde_json::Value> {
    let (_, sent) = app
        .post(
            "/api/business-verifications/verify-phone/send-otp",
            Some(token),
            json!({ "phoneNumber": phone, "countryCode": "LK" }),
        )
        .await?;
    let otp_id = sent["data"]["otpId"].as_str().expect("otpId").to_string();
    let code = app.issued_code(&otp_id).await?;
    let (status, verified) = app
        .post(
            "/api/business-verifications/verify-phone/verify-otp",
            Some(token),
            json!({ "phoneNumber": phone, "otp": code, "otpId": otp_id, "countryCode": "LK" }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", verified);
    Ok(verified)
}

#[tokio::test]
async fn verifying_another_number_leaves_the_submitted_phone_unverified() -> Result<()> {
    let Some(app) = common::test_app().await? else {
        return Ok(());
    };
    let (user_id, token) = app.user(None, None).await?;
    let submitted = common::fresh_lk_mobile();
    let other = common::fresh_lk_mobile();

    let (status, created) = app
        .post(
            "/api/business-verifications",
            Some(&token),
            json!({
                "businessName": "Two Phones Ltd",
                "businessEmail": common::fresh_email(),
                "businessPhone": submitted,
                "country": "LK",
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", created);

    verify_phone(&app, &token, &other).await?;
    let uri = format!("/api/business-verifications/user/{}", user_id);
    let (_, own) = app.get(&uri, &token).await?;
    assert_eq!(own["data"]["businessPhone"], submitted);
    assert_eq!(own["data"]["phoneVerified"], false);

    // the other number is still kept as a verified professional contact
    let kept: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM user_phone_numbers WHERE user_id = $1 AND is_verified",
    )
    .bind(user_id)
    .fetch_one(app.pool())
    .await?;
    assert_eq!(kept, 1);

    verify_phone(&app, &token, &common::international(&submitted)).await?;
    let (_, own) = app.get(&uri, &token).await?;
    assert_eq!(own["data"]["phoneVerified"], true);
    Ok(())
}
