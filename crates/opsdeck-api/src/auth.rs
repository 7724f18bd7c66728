use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{error, warn};

use opsdeck_auth::{CredentialError, CredentialStore};
use opsdeck_db::Database;
use opsdeck_types::api::{AuthResponse, Claims, LoginRequest, RegisterRequest};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub credentials: CredentialStore,
    pub jwt_secret: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    // Validate input
    if req.username.len() < 3 || req.username.len() > 32 {
        return Err(StatusCode::BAD_REQUEST);
    }
    if req.password.len() < 8 {
        return Err(StatusCode::BAD_REQUEST);
    }
    if req.role.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    // Argon2 hashing is CPU-bound, run it off the async runtime
    let store = state.credentials.clone();
    let (username, password, role) = (req.username.clone(), req.password, req.role.clone());
    let result = tokio::task::spawn_blocking(move || store.register(&username, &password, &role))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    match result {
        Ok(()) => {}
        Err(CredentialError::DuplicateUser) => return Err(StatusCode::CONFLICT),
        Err(e) => {
            error!("registration failed for '{}': {}", req.username, e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    let token = create_token(&state.jwt_secret, &req.username, &req.role)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            username: req.username,
            role: req.role,
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let store = state.credentials.clone();
    let (username, password) = (req.username.clone(), req.password);
    let result = tokio::task::spawn_blocking(move || store.verify(&username, &password))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let verified = match result {
        Ok(v) => v,
        // Unknown user and wrong password are kept distinct in the audit log
        // but collapse into one generic 401, so usernames cannot be
        // enumerated through the login form.
        Err(e @ (CredentialError::UserNotFound | CredentialError::BadPassword)) => {
            warn!("login rejected for '{}': {}", req.username, e);
            return Err(StatusCode::UNAUTHORIZED);
        }
        Err(e) => {
            error!("login failed for '{}': {}", req.username, e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let token = create_token(&state.jwt_secret, &verified.username, &verified.role)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(AuthResponse {
        username: verified.username,
        role: verified.role,
        token,
    }))
}

fn create_token(secret: &str, username: &str, role: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: username.to_string(),
        role: role.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::hours(12)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{DecodingKey, Validation, decode};

    #[test]
    fn token_roundtrip() {
        let token = create_token("test-secret", "alice", "analyst").unwrap();

        let data = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"test-secret"),
            &Validation::default(),
        )
        .unwrap();

        assert_eq!(data.claims.sub, "alice");
        assert_eq!(data.claims.role, "analyst");
    }

    #[test]
    fn token_rejects_wrong_secret() {
        let token = create_token("test-secret", "alice", "analyst").unwrap();

        let result = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"other-secret"),
            &Validation::default(),
        );
        assert!(result.is_err());
    }
}
