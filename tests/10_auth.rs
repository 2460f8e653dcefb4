mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use devcamper_api::auth::{generate_jwt, Claims};
use devcamper_api::types::Role;

use common::{TestApp, PUBLISHER, USER};

#[tokio::test]
async fn protected_route_without_token_is_401() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (status, body) = app.get("/api/v1/auth/me").await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED, "body: {}", body);
    assert_eq!(body["success"], false);
    Ok(())
}

#[tokio::test]
async fn garbage_token_is_401() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (status, _) = app
        .send(Method::GET, "/api/v1/auth/me", Some("not.a.jwt"), None)
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn token_signed_with_other_secret_is_401() -> Result<()> {
    let app = TestApp::spawn().await?;
    let forged = generate_jwt(&Claims::new(USER.to_string(), Role::Admin, 1), "some-other-secret")?;
    let (status, _) = app
        .send(Method::GET, "/api/v1/auth/me", Some(&forged), None)
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn token_for_unknown_user_is_401() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.token("000000000000000000000000", Role::Admin);
    let (status, _) = app.send(Method::GET, "/api/v1/auth/me", Some(&token), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn me_returns_own_user_document() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.token(PUBLISHER, Role::Publisher);
    let (status, body) = app.send(Method::GET, "/api/v1/auth/me", Some(&token), None).await?;

    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(body["data"]["id"], PUBLISHER);
    assert_eq!(body["data"]["role"], "publisher");
    Ok(())
}

#[tokio::test]
async fn stored_role_wins_over_token_claim() -> Result<()> {
    let app = TestApp::spawn().await?;
    // A plain user holding a token that claims admin still can't list users
    let token = app.token(USER, Role::Admin);
    let (status, body) = app.send(Method::GET, "/api/v1/users", Some(&token), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN, "body: {}", body);
    Ok(())
}

#[tokio::test]
async fn public_reads_need_no_token() -> Result<()> {
    let app = TestApp::spawn().await?;
    for uri in ["/", "/health", "/api/v1/bootcamps", "/api/v1/courses", "/api/v1/reviews"] {
        let (status, body) = app.get(uri).await?;
        assert_eq!(status, StatusCode::OK, "{} -> {}", uri, body);
    }
    Ok(())
}
