//! JWT authentication.
//!
//! Tokens are issued by the external auth service; this module only
//! validates them (HS256, shared secret) and turns the claims into
//! [`AuthUser`] / [`AdminUser`] extractors.
//!
//! ```text
//! Authorization: Bearer <jwt>
//!      │
//!      ▼
//! JwtValidator::validate ── bad/expired ──► 401 UNAUTHORIZED
//!      │
//!      ▼
//! AuthUser { user_id, role } ── AdminUser on a customer ──► 403 FORBIDDEN
//! ```

use axum::extract::FromRef;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    /// `customer` or `admin`
    #[serde(default = "default_role")]
    pub role: String,

    /// Expiration (Unix timestamp)
    pub exp: i64,
}

fn default_role() -> String {
    Role::Customer.as_str().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Admin => "admin",
        }
    }

    /// Unknown roles get the least privilege.
    fn parse(role: &str) -> Self {
        if role.eq_ignore_ascii_case("admin") {
            Role::Admin
        } else {
            Role::Customer
        }
    }
}

/// Validates bearer tokens.
#[derive(Clone)]
pub struct JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtValidator").field("key", &"[REDACTED]").finish()
    }
}

impl JwtValidator {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        JwtValidator {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Decodes and checks a token.
    pub fn validate(&self, token: &str) -> Result<AuthUser, ApiError> {
        let data = decode::<Claims>(token, &self.key, &self.validation)
            .map_err(|e| ApiError::Unauthorized(format!("Invalid token: {}", e)))?;

        let user_id = data
            .claims
            .sub
            .parse::<i64>()
            .map_err(|_| ApiError::Unauthorized("Invalid token subject".to_string()))?;

        Ok(AuthUser {
            user_id,
            role: Role::parse(&data.claims.role),
        })
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

// =============================================================================
// Extractors
// =============================================================================

/// Any authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: i64,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Owners and admins may read an order or its invoice.
    pub fn ensure_can_access(&self, owner_id: i64) -> Result<(), ApiError> {
        if self.is_admin() || self.user_id == owner_id {
            Ok(())
        } else {
            Err(ApiError::Forbidden("You do not have access to this order".to_string()))
        }
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing authorization header".to_string()))?;
        let token = extract_bearer_token(header)
            .ok_or_else(|| ApiError::Unauthorized("Expected a Bearer token".to_string()))?;

        let state = AppState::from_ref(state);
        let user = state.jwt.validate(token)?;
        tracing::debug!(user_id = user.user_id, role = user.role.as_str(), "Authenticated");
        Ok(user)
    }
}

/// An authenticated caller with the admin role.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser(pub AuthUser);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(ApiError::Forbidden("Admin access required".to_string()));
        }
        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token(secret: &str, sub: &str, role: &str, exp_offset: i64) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            role: role.to_string(),
            exp: Utc::now().timestamp() + exp_offset,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn test_valid_token() {
        let validator = JwtValidator::new("secret");
        let user = validator.validate(&token("secret", "42", "admin", 3600)).unwrap();
        assert_eq!(user.user_id, 42);
        assert!(user.is_admin());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let validator = JwtValidator::new("secret");
        let result = validator.validate(&token("other", "42", "customer", 3600));
        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn test_expired_token_rejected() {
        let validator = JwtValidator::new("secret");
        let result = validator.validate(&token("secret", "42", "customer", -3600));
        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn test_non_numeric_subject_rejected() {
        let validator = JwtValidator::new("secret");
        let result = validator.validate(&token("secret", "alice", "customer", 3600));
        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn test_unknown_role_is_customer() {
        let validator = JwtValidator::new("secret");
        let user = validator.validate(&token("secret", "7", "superuser", 3600)).unwrap();
        assert_eq!(user.role, Role::Customer);
    }

    #[test]
    fn test_ownership() {
        let customer = AuthUser { user_id: 1, role: Role::Customer };
        assert!(customer.ensure_can_access(1).is_ok());
        assert!(customer.ensure_can_access(2).is_err());

        let admin = AuthUser { user_id: 9, role: Role::Admin };
        assert!(admin.ensure_can_access(2).is_ok());
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("Basic abc"), None);
        assert_eq!(extract_bearer_token("Bearer "), None);
    }
}
