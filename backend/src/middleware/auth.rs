//! Authentication middleware
//!
//! JWT authentication and capability-based access control. Tokens are
//! issued elsewhere; this module only verifies them.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use shared::{Capability, CapabilitySet, Role};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::AppState;

/// Authenticated user information extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub role: Role,
    /// Capabilities in effect for the role
    pub capabilities: CapabilitySet,
}

impl AuthUser {
    /// Check if user holds a capability
    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities.contains(capability)
    }

    /// Fail with `InsufficientPermissions` unless the capability is held
    pub fn require(&self, capability: Capability) -> AppResult<()> {
        if self.can(capability) {
            Ok(())
        } else {
            tracing::debug!(user_id = %self.user_id, %capability, "Capability missing");
            Err(AppError::InsufficientPermissions)
        }
    }

    /// Platform admins are not company members
    pub fn require_company_access(&self) -> AppResult<()> {
        match self.role {
            Role::Admin => Err(AppError::InsufficientPermissions),
            Role::Manager | Role::User => Ok(()),
        }
    }

    /// Fail with `InsufficientPermissions` unless the user has the role
    pub fn require_role(&self, role: Role) -> AppResult<()> {
        if self.role == role {
            Ok(())
        } else {
            Err(AppError::InsufficientPermissions)
        }
    }
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub company_id: String,
    pub role: Role,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
}

impl Claims {
    /// Resolve the claims into an authenticated user
    pub fn into_auth_user(self) -> AppResult<AuthUser> {
        let user_id = Uuid::parse_str(&self.sub)
            .map_err(|_| AppError::unauthorized("Invalid user ID in token"))?;
        let company_id = Uuid::parse_str(&self.company_id)
            .map_err(|_| AppError::unauthorized("Invalid company ID in token"))?;

        let granted = CapabilitySet::parse(&self.permissions)
            .map_err(|e| AppError::unauthorized(format!("Invalid token: {}", e)))?;

        Ok(AuthUser {
            user_id,
            company_id,
            role: self.role,
            capabilities: CapabilitySet::effective(self.role, granted),
        })
    }
}

/// Decode and validate JWT token
pub fn decode_jwt(token: &str, secret: &str) -> AppResult<Claims> {
    use jsonwebtoken::{decode, DecodingKey, Validation};

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::unauthorized(format!("Invalid token: {}", e)))
}

/// Authentication middleware that validates JWT tokens and stores the
/// resulting [`AuthUser`] as a request extension
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) => token,
        None => {
            return AppError::unauthorized("Missing or invalid Authorization header")
                .into_response();
        }
    };

    let auth_user = match decode_jwt(token, &state.config.jwt.secret)
        .and_then(Claims::into_auth_user)
    {
        Ok(user) => user,
        Err(err) => return err.into_response(),
    };

    request.extensions_mut().insert(auth_user);

    next.run(request).await
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AppError::unauthorized("Authentication required"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn claims(role: Role, permissions: &[&str]) -> Claims {
        Claims {
            sub: Uuid::new_v4().to_string(),
            company_id: Uuid::new_v4().to_string(),
            role,
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
            exp: chrono::Utc::now().timestamp() + 3600,
            iat: chrono::Utc::now().timestamp(),
        }
    }

    #[test]
    fn test_decode_round_trip() {
        let token = encode(
            &Header::default(),
            &claims(Role::User, &["add_stock"]),
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        let user = decode_jwt(&token, "secret").unwrap().into_auth_user().unwrap();
        assert!(user.can(Capability::AddStock));
        assert!(user.require(Capability::RemoveStock).is_err());
        assert!(decode_jwt(&token, "other").is_err());
    }

    #[test]
    fn test_unknown_permission_is_rejected() {
        let result = claims(Role::User, &["fly"]).into_auth_user();
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_manager_gets_all_capabilities() {
        let user = claims(Role::Manager, &[]).into_auth_user().unwrap();
        assert!(user.require(Capability::SeeProfit).is_ok());
        assert!(user.require_role(Role::Manager).is_ok());
        assert!(user.require_role(Role::Admin).is_err());
    }
}
