mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn public_send_and_verify_round_trip() -> Result<()> {
    let Some(app) = common::test_app().await? else {
        return Ok(());
    };
    let phone = common::fresh_lk_mobile();

    let (status, sent) = app
        .post(
            "/api/sms/send-otp",
            None,
            json!({ "phoneNumber": phone, "countryCode": "LK" }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", sent);
    assert_eq!(sent["data"]["destination"], common::international(&phone));
    assert_eq!(sent["data"]["expiresIn"], 300);
    let otp_id = sent["data"]["otpId"].as_str().expect("otpId").to_string();
    let code = app.issued_code(&otp_id).await?;

    let (status, body) = app
        .post(
            "/api/sms/verify-otp",
            None,
            json!({ "phone": phone, "code": "000000", "otpId": otp_id }),
        )
        .await?;
    // 000000 could only collide with a random code one time in a million
    if code != "000000" {
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
        assert_eq!(body["code"], "INVALID_OTP");
    }

    let (status, body) = app
        .post(
            "/api/sms/verify-otp",
            None,
            json!({ "phoneNumber": common::international(&phone), "otp": code, "otpId": otp_id }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["verified"], true);

    let (status, body) = app
        .post(
            "/api/sms/verify-otp",
            None,
            json!({ "phoneNumber": phone, "otp": code }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["alreadyVerified"], true);
    Ok(())
}

#[tokio::test]
async fn exhausted_challenge_rejects_the_right_code() -> Result<()> {
    let Some(app) = common::test_app().await? else {
        return Ok(());
    };
    let phone = common::fresh_lk_mobile();

    let (_, sent) = app
        .post("/api/sms/send-otp", None, json!({ "phoneNumber": phone }))
        .await?;
    let otp_id = sent["data"]["otpId"].as_str().expect("otpId").to_string();
    let code = app.issued_code(&otp_id).await?;
    let wrong = if code == "999999" { "111111" } else { "999999" };

    for _ in 0..3 {
        app.post(
            "/api/sms/verify-otp",
            None,
            json!({ "phoneNumber": phone, "otp": wrong, "otpId": otp_id }),
        )
        .await?;
    }

    let (status, body) = app
        .post(
            "/api/sms/verify-otp",
            None,
            json!({ "phoneNumber": phone, "otp": code, "otpId": otp_id }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
    assert_eq!(body["code"], "OTP_MAX_ATTEMPTS_EXCEEDED");
    Ok(())
}

#[tokio::test]
async fn sends_are_rate_limited_per_destination() -> Result<()> {
    let Some(app) = common::test_app().await? else {
        return Ok(());
    };
    let phone = common::fresh_lk_mobile();

    for _ in 0..10 {
        let (status, body) = app
            .post("/api/sms/send-otp", None, json!({ "phoneNumber": phone }))
            .await?;
        assert_eq!(status, StatusCode::OK, "{}", body);
    }
    let (status, _) = app
        .post("/api/sms/send-otp", None, json!({ "phoneNumber": phone }))
        .await?;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    let (status, _) = app
        .post(
            "/api/sms/send-otp",
            None,
            json!({ "phoneNumber": common::fresh_lk_mobile() }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn missing_phone_is_a_validation_error() -> Result<()> {
    let Some(app) = common::test_app().await? else {
        return Ok(());
    };
    let (status, body) = app.post("/api/sms/send-otp", None, json!({})).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    Ok(())
}
