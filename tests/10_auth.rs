mod common;

use std::time::Duration;

use anyhow::Result;
use http::StatusCode;
use pathwise::token::{Claims, TokenService};

#[tokio::test]
async fn me_requires_a_token() -> Result<()> {
    let app = common::app()?;

    let resp = common::send(&app.router, "GET", "/api/auth/me", &[]).await;
    assert_eq!(resp.status_code(), StatusCode::UNAUTHORIZED);
    let body = common::json(&resp);
    assert_eq!(body["error"], "Unauthorized");
    assert_eq!(body["message"], "Authentication token missing");
    Ok(())
}

#[tokio::test]
async fn me_echoes_the_bearer_identity() -> Result<()> {
    let app = common::app()?;
    let token = common::token(&common::config(&[]), "user-7", "user")?;

    let auth = format!("Bearer {token}");
    let resp = common::send(&app.router, "GET", "/api/auth/me", &[("authorization", &auth)]).await;
    assert_eq!(resp.status_code(), StatusCode::OK);
    let body = common::json(&resp);
    assert_eq!(body["subject"], "user-7");
    assert_eq!(body["role"], "user");
    Ok(())
}

#[tokio::test]
async fn cookie_credential_is_accepted() -> Result<()> {
    let app = common::app()?;
    let token = common::token(&common::config(&[]), "user-8", "admin")?;

    let cookie = format!("theme=dark; auth_token={token}");
    let resp = common::send(&app.router, "GET", "/api/auth/me", &[("cookie", &cookie)]).await;
    assert_eq!(resp.status_code(), StatusCode::OK);
    assert_eq!(common::json(&resp)["subject"], "user-8");
    Ok(())
}

#[tokio::test]
async fn bad_tokens_fail_authentication() -> Result<()> {
    let app = common::app()?;

    let foreign = TokenService::new(b"someone-else", Duration::from_secs(60)).issue("x", "x@example.com", "user")?;
    let now = chrono::Utc::now().timestamp();
    let expired = TokenService::new(common::SECRET.as_bytes(), Duration::from_secs(60)).sign(&Claims {
        sub: "old".into(),
        email: "old@example.com".into(),
        role: "user".into(),
        iat: now - 7200,
        exp: now - 3600,
    })?;

    for token in [foreign.as_str(), expired.as_str(), "not-a-jwt"] {
        let auth = format!("Bearer {token}");
        let resp = common::send(&app.router, "GET", "/api/auth/me", &[("authorization", &auth)]).await;
        assert_eq!(resp.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(common::json(&resp)["message"], "Authentication failed");
    }
    Ok(())
}

#[tokio::test]
async fn malformed_header_counts_as_missing() -> Result<()> {
    let app = common::app()?;
    let resp = common::send(&app.router, "GET", "/api/auth/me", &[("authorization", "Token abc")]).await;
    assert_eq!(common::json(&resp)["message"], "Authentication token missing");
    Ok(())
}

#[tokio::test]
async fn open_routes_skip_authentication() -> Result<()> {
    let app = common::app()?;

    let login = common::send(&app.router, "POST", "/api/auth/login", &[]).await;
    assert_eq!(login.status_code(), StatusCode::NOT_IMPLEMENTED);

    let logout = common::send(&app.router, "POST", "/api/auth/logout", &[]).await;
    assert_eq!(logout.status_code(), StatusCode::UNAUTHORIZED);
    Ok(())
}
