//! Bearer token verification and role checks

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::env;
use tracing::{error, warn};

use crate::{error::ApiError, state::AppState};

pub const ADMIN_ROLE: &str = "admin";

/// Claims issued by the identity provider
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject at the identity provider
    pub sub: String,
    /// Verified email, used as the user id
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    /// Expiration time
    pub exp: u64,
}

/// Authenticated caller, inserted into request extensions
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// Canonical user id (the verified email)
    pub id: String,
    pub roles: Vec<String>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|role| role == ADMIN_ROLE)
    }
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// PEM encoded RSA public key
    pub public_key: String,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

impl JwtConfig {
    /// Read `JWT_PUBLIC_KEY` (PEM, or a path to a PEM file), `JWT_ISSUER`
    /// and `JWT_AUDIENCE`
    pub fn from_env() -> Result<Self, String> {
        let public_key = env::var("JWT_PUBLIC_KEY")
            .map_err(|_| "JWT_PUBLIC_KEY environment variable not set".to_string())?;

        let public_key = if public_key.starts_with("-----BEGIN") {
            public_key
        } else {
            std::fs::read_to_string(&public_key)
                .map_err(|e| format!("Failed to read public key file: {}", e))?
                .trim()
                .to_string()
        };

        Ok(JwtConfig {
            public_key,
            issuer: env::var("JWT_ISSUER").ok().filter(|v| !v.is_empty()),
            audience: env::var("JWT_AUDIENCE").ok().filter(|v| !v.is_empty()),
        })
    }
}

/// Key and validation rules, prepared once at startup
#[derive(Clone)]
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(key: DecodingKey, mut validation: Validation) -> Self {
        validation.validate_exp = true;
        Self { key, validation }
    }

    /// RS256 verifier for the configured public key
    pub fn from_config(config: &JwtConfig) -> Result<Self, jsonwebtoken::errors::Error> {
        let key = DecodingKey::from_rsa_pem(config.public_key.as_bytes())?;
        let mut validation = Validation::new(Algorithm::RS256);
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }
        if let Some(audience) = &config.audience {
            validation.set_audience(&[audience]);
        }
        Ok(Self::new(key, validation))
    }

    pub fn verify(&self, token: &str) -> Result<AuthUser, ApiError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.key, &self.validation).map_err(
            |e| {
                warn!("Failed to validate token: {}", e);
                ApiError::Unauthorized
            },
        )?;

        let email = data
            .claims
            .email
            .filter(|email| !email.trim().is_empty())
            .ok_or_else(|| {
                warn!(sub = %data.claims.sub, "Token carries no email");
                ApiError::Unauthorized
            })?;

        Ok(AuthUser {
            id: email,
            roles: data.claims.roles,
        })
    }
}

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(ApiError::Unauthorized)?;
    let user = state.jwt.verify(bearer.token())?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Rejects callers without the admin role. Runs after [`auth_middleware`].
pub async fn require_admin(req: Request, next: Next) -> Result<Response, ApiError> {
    let user = req.extensions().get::<AuthUser>().ok_or_else(|| {
        error!("Admin check ran without an authenticated user");
        ApiError::Unauthorized
    })?;

    if !user.is_admin() {
        warn!(user_id = %user.id, "Admin route denied");
        return Err(ApiError::Forbidden("Admin role required".to_string()));
    }

    Ok(next.run(req).await)
}
