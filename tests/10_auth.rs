mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

use common::{unique, Api};

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let api = Api::anonymous().await?;
    let (status, body) = api.get("/health").await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn root_describes_the_service() -> Result<()> {
    let api = Api::anonymous().await?;
    let (status, body) = api.get("/").await?;

    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["endpoints"]["forms"].is_string());
    Ok(())
}

#[tokio::test]
async fn register_returns_tokens_and_login_works() -> Result<()> {
    let (api, session) = Api::signed_in().await?;
    let username = session["user"]["username"].as_str().unwrap().to_string();
    assert!(session["refresh"].is_string());

    let (status, me) = api.get("/api/auth/whoami").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["data"]["username"], username.as_str());

    let anon = Api::anonymous().await?;
    let (status, body) = anon
        .post("/api/auth/login", json!({ "username": username, "password": "integration-pass" }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["access"].is_string());

    let (status, body) = anon
        .post("/api/auth/login", json!({ "username": username, "password": "wrong" }))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid credentials");
    Ok(())
}

#[tokio::test]
async fn duplicate_username_and_bad_passwords_are_rejected() -> Result<()> {
    let (_, session) = Api::signed_in().await?;
    let anon = Api::anonymous().await?;

    let (status, body) = anon
        .post(
            "/api/auth/register",
            json!({
                "username": session["user"]["username"],
                "password": "integration-pass",
                "password2": "integration-pass"
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["username"].is_string());

    let (status, body) = anon
        .post(
            "/api/auth/register",
            json!({ "username": unique("user"), "password": "12345678", "password2": "12345678" }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["password"].is_string());

    let (status, body) = anon
        .post(
            "/api/auth/register",
            json!({ "username": unique("user"), "password": "integration-pass", "password2": "other-pass-1" }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["password2"].is_string());
    Ok(())
}

#[tokio::test]
async fn protected_routes_need_an_access_token() -> Result<()> {
    let mut api = Api::anonymous().await?;

    let (status, body) = api.get("/api/forms").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    api.token = Some("not-a-jwt".to_string());
    let (status, _) = api.get("/api/dashboard").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn refresh_token_yields_access_token() -> Result<()> {
    let (_, session) = Api::signed_in().await?;
    let mut anon = Api::anonymous().await?;

    let (status, body) = anon
        .post("/api/auth/token/refresh", json!({ "refresh": session["refresh"] }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    let access = body["data"]["access"].as_str().unwrap().to_string();

    // an access token is not accepted as a refresh token
    let (status, _) = anon
        .post("/api/auth/token/refresh", json!({ "refresh": session["access"] }))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // nor is a refresh token accepted as a bearer token
    anon.token = session["refresh"].as_str().map(str::to_string);
    let (status, _) = anon.get("/api/auth/whoami").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    anon.token = Some(access);
    let (status, _) = anon.get("/api/auth/whoami").await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn change_password_requires_the_old_one() -> Result<()> {
    let (api, session) = Api::signed_in().await?;

    let (status, body) = api
        .post(
            "/api/auth/change-password",
            json!({ "old_password": "nope", "new_password": "brand-new-pass", "new_password2": "brand-new-pass" }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["old_password"].is_string());

    let (status, body) = api
        .post(
            "/api/auth/change-password",
            json!({
                "old_password": "integration-pass",
                "new_password": "brand-new-pass",
                "new_password2": "brand-new-pass"
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["message"], "Password updated successfully");

    let anon = Api::anonymous().await?;
    let (status, _) = anon
        .post(
            "/api/auth/login",
            json!({ "username": session["user"]["username"], "password": "brand-new-pass" }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn profile_can_be_read_and_patched() -> Result<()> {
    let (api, _) = Api::signed_in().await?;

    let (status, body) = api.get("/api/auth/profile").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["phone"], "");

    let (status, body) = api.put("/api/auth/profile", json!({ "address": "1 Main St" })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["address"], "1 Main St");
    assert_eq!(body["data"]["phone"], "");
    Ok(())
}
