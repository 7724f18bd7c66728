use axum::{
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};

use opsdeck_types::api::Claims;

use crate::auth::AppState;

/// Extract and validate the JWT from the Authorization header, then attach
/// the claims to the request. Handlers downstream receive the caller's
/// identity and role as an explicit extension value rather than any ambient
/// global state. Tokens are checked against the same secret the login
/// handlers sign with, held in shared state.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| StatusCode::UNAUTHORIZED)?;

    req.extensions_mut().insert(token_data.claims);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use axum::{Router, body::Body, middleware::from_fn_with_state, routing::get};
    use jsonwebtoken::{EncodingKey, Header, encode};
    use tower::ServiceExt;

    use opsdeck_auth::CredentialStore;
    use opsdeck_db::Database;

    use crate::auth::AppStateInner;

    async fn ping() -> StatusCode {
        StatusCode::OK
    }

    fn app() -> Router {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let credentials = CredentialStore::new(db.clone()).unwrap();
        let state: AppState = Arc::new(AppStateInner {
            db,
            credentials,
            jwt_secret: "test-secret".into(),
        });

        Router::new()
            .route("/ping", get(ping))
            .layer(from_fn_with_state(state, require_auth))
    }

    fn bearer(secret: &str) -> String {
        let claims = Claims {
            sub: "alice".into(),
            role: "analyst".into(),
            exp: (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();
        format!("Bearer {}", token)
    }

    #[tokio::test]
    async fn missing_token_is_rejected() {
        let req = Request::builder().uri("/ping").body(Body::empty()).unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn foreign_secret_is_rejected() {
        let req = Request::builder()
            .uri("/ping")
            .header(header::AUTHORIZATION, bearer("other-secret"))
            .body(Body::empty())
            .unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn state_secret_is_accepted() {
        let req = Request::builder()
            .uri("/ping")
            .header(header::AUTHORIZATION, bearer("test-secret"))
            .body(Body::empty())
            .unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
