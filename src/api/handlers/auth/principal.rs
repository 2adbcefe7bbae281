//! Authorization gate: token verification plus role gating.
//!
//! `require_auth` re-checks the active flag with a store lookup on every
//! request, so a deactivated account is blocked even while its token is
//! still cryptographically valid. Role and password changes are not
//! re-checked; they take effect when the token expires.

use axum::http::HeaderMap;
use tracing::debug;
use uuid::Uuid;

use super::error::AuthFailure;
use super::state::AuthState;
use super::token::TokenError;
use super::utils::extract_bearer_token;
use crate::storage::Role;

/// Authenticated caller context derived from the bearer token.
#[derive(Clone, Debug)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

/// Resolve the bearer token into a principal.
///
/// # Errors
/// `Unauthorized` for missing/invalid/expired tokens or unknown subjects,
/// `AccountInactive` for deactivated accounts.
pub async fn require_auth(
    headers: &HeaderMap,
    state: &AuthState,
) -> Result<Principal, AuthFailure> {
    let token = extract_bearer_token(headers).ok_or(AuthFailure::Unauthorized)?;
    let claims = state.signer().verify(&token).map_err(|err| {
        match err {
            TokenError::Expired => debug!("rejected expired session token"),
            other => debug!("rejected invalid session token: {other}"),
        }
        AuthFailure::Unauthorized
    })?;

    let user = state
        .store()
        .find_by_id(claims.sub)
        .await
        .map_err(|err| AuthFailure::from_store(&err))?
        .ok_or(AuthFailure::Unauthorized)?;
    if !user.is_active {
        return Err(AuthFailure::AccountInactive);
    }

    Ok(Principal {
        user_id: user.id,
        email: user.email,
        // The claims carry the role on purpose: promotions/demotions apply
        // at the next token issuance, not immediately.
        role: claims.role,
    })
}

/// Pure role membership check; no side effects.
///
/// # Errors
/// `Forbidden` when the principal's role is not in `allowed`.
pub fn require_role(principal: &Principal, allowed: &[Role]) -> Result<(), AuthFailure> {
    if allowed.contains(&principal.role) {
        Ok(())
    } else {
        Err(AuthFailure::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: Role) -> Principal {
        Principal {
            user_id: Uuid::new_v4(),
            email: "user@example.com".to_string(),
            role,
        }
    }

    #[test]
    fn user_role_rejected_for_admin_operations() {
        let caller = principal(Role::User);
        assert_eq!(
            require_role(&caller, &[Role::Admin]),
            Err(AuthFailure::Forbidden)
        );
    }

    #[test]
    fn admin_role_admitted() {
        let caller = principal(Role::Admin);
        assert!(require_role(&caller, &[Role::Admin]).is_ok());
        assert!(require_role(&caller, &[Role::Admin, Role::User]).is_ok());
    }

    #[test]
    fn empty_role_set_admits_nobody() {
        let caller = principal(Role::Admin);
        assert_eq!(require_role(&caller, &[]), Err(AuthFailure::Forbidden));
    }
}
