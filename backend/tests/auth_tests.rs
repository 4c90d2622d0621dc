//! Authentication and authorization tests
//!
//! Property-based and unit tests for:
//! - Capability resolution from token claims
//! - Role handling (managers, members, platform admins)
//! - Token verification

use jsonwebtoken::{encode, EncodingKey, Header};
use proptest::prelude::*;
use shared::{Capability, Role};
use stockroom_backend::middleware::{decode_jwt, Claims};
use stockroom_backend::AppError;
use uuid::Uuid;

const SECRET: &str = "auth-test-secret";

// ============================================================================
// Property Test Strategies
// ============================================================================

/// Generate any subset of the capability names
fn capability_subset_strategy() -> impl Strategy<Value = Vec<Capability>> {
    prop::sample::subsequence(Capability::ALL.to_vec(), 0..=Capability::ALL.len())
}

/// Generate names that are not capabilities
fn unknown_permission_strategy() -> impl Strategy<Value = String> {
    "[a-z]{3,12}:[a-z]{3,8}"
}

fn role_strategy() -> impl Strategy<Value = Role> {
    prop_oneof![Just(Role::Admin), Just(Role::Manager), Just(Role::User)]
}

fn claims(role: Role, permissions: Vec<String>, exp_offset: i64) -> Claims {
    let now = chrono::Utc::now().timestamp();
    Claims {
        sub: Uuid::new_v4().to_string(),
        company_id: Uuid::new_v4().to_string(),
        role,
        permissions,
        exp: now + exp_offset,
        iat: now,
    }
}

fn sign(claims: &Claims) -> String {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
    /// A member holds exactly the capabilities granted in the token
    #[test]
    fn test_member_capabilities_match_grant(granted in capability_subset_strategy()) {
        let names = granted.iter().map(|c| c.as_str().to_string()).collect();
        let user = claims(Role::User, names, 3600).into_auth_user().unwrap();

        for capability in Capability::ALL {
            prop_assert_eq!(user.can(capability), granted.contains(&capability));
            prop_assert_eq!(user.require(capability).is_ok(), granted.contains(&capability));
        }
    }

    /// Managers hold every capability and admins none, whatever the grant
    #[test]
    fn test_role_overrides_grant(
        role in role_strategy(),
        granted in capability_subset_strategy(),
    ) {
        let names = granted.iter().map(|c| c.as_str().to_string()).collect();
        let user = claims(role, names, 3600).into_auth_user().unwrap();

        match role {
            Role::Manager => {
                prop_assert!(Capability::ALL.iter().all(|&c| user.can(c)));
            }
            Role::Admin => {
                prop_assert!(Capability::ALL.iter().all(|&c| !user.can(c)));
                prop_assert!(user.require_company_access().is_err());
            }
            Role::User => {
                prop_assert!(user.require_company_access().is_ok());
            }
        }
    }

    /// Unknown permission names invalidate the token
    #[test]
    fn test_unknown_permissions_are_rejected(name in unknown_permission_strategy()) {
        let result = claims(Role::User, vec![name], 3600).into_auth_user();
        prop_assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[test]
fn test_signed_token_round_trip() {
    let original = claims(Role::User, vec!["see_cost".to_string()], 3600);
    let decoded = decode_jwt(&sign(&original), SECRET).unwrap();
    assert_eq!(decoded.sub, original.sub);
    assert_eq!(decoded.role, Role::User);
    assert_eq!(decoded.permissions, vec!["see_cost".to_string()]);
}

#[test]
fn test_expired_token_is_rejected() {
    let token = sign(&claims(Role::Manager, vec![], -3600));
    assert!(matches!(
        decode_jwt(&token, SECRET),
        Err(AppError::Unauthorized(_))
    ));
}

#[test]
fn test_wrong_secret_is_rejected() {
    let token = sign(&claims(Role::Manager, vec![], 3600));
    assert!(decode_jwt(&token, "another-secret").is_err());
}

#[test]
fn test_malformed_ids_are_rejected() {
    let mut bad = claims(Role::User, vec![], 3600);
    bad.company_id = "not-a-uuid".to_string();
    assert!(matches!(bad.into_auth_user(), Err(AppError::Unauthorized(_))));
}
