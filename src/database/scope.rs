use crate::auth::Role;
use crate::error::ApiError;
use crate::middleware::AuthUser;

/// Canonical form of a country code: two ASCII letters, uppercased.
pub fn canonical_country_code(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.len() == 2 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(trimmed.to_ascii_uppercase())
    } else {
        None
    }
}

/// Row visibility for an admin request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountryScope {
    Global,
    Country(String),
}

impl CountryScope {
    /// Derive the scope from the caller's role and an optional `country` filter.
    ///
    /// Super admins see everything unless they filter; country admins are pinned
    /// to their own country and asking for another one is a permission error.
    pub fn for_user(user: &AuthUser, requested: Option<&str>) -> Result<Self, ApiError> {
        let requested = match requested.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Some(canonical_country_code(raw).ok_or_else(|| {
                ApiError::bad_request(format!("Invalid country code '{}'", raw))
            })?),
            None => None,
        };

        match user.role {
            Role::SuperAdmin => Ok(requested.map_or(CountryScope::Global, CountryScope::Country)),
            Role::CountryAdmin => {
                let own = user
                    .country_code
                    .clone()
                    .ok_or_else(|| ApiError::forbidden("Country admin has no country assignment"))?;
                match requested {
                    Some(code) if code != own => Err(ApiError::forbidden(format!(
                        "Access denied to country {}",
                        code
                    ))),
                    _ => Ok(CountryScope::Country(own)),
                }
            }
            Role::User => Err(ApiError::forbidden("Insufficient permissions")),
        }
    }

    pub fn country(&self) -> Option<&str> {
        match self {
            CountryScope::Global => None,
            CountryScope::Country(code) => Some(code),
        }
    }

    /// Whether a row stored with `country` is visible in this scope
    pub fn allows(&self, country: &str) -> bool {
        match self {
            CountryScope::Global => true,
            CountryScope::Country(code) => {
                canonical_country_code(country).as_deref() == Some(code.as_str())
            }
        }
    }

    /// Scope check for reads by id: rows outside the scope do not exist
    pub fn ensure_visible(&self, country: &str, what: &str) -> Result<(), ApiError> {
        if self.allows(country) {
            Ok(())
        } else {
            Err(ApiError::not_found(format!("{} not found", what)))
        }
    }

    /// Scope check for mutations: rows outside the scope are forbidden
    pub fn ensure_mutable(&self, country: &str) -> Result<(), ApiError> {
        if self.allows(country) {
            Ok(())
        } else {
            Err(ApiError::forbidden(format!(
                "Access denied to country {}",
                country
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn admin(role: Role, country: Option<&str>) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            email: None,
            role,
            country_code: country.map(str::to_string),
        }
    }

    #[test]
    fn canonicalisation_accepts_only_two_letters() {
        assert_eq!(canonical_country_code(" lk"), Some("LK".to_string()));
        assert_eq!(canonical_country_code("Ae "), Some("AE".to_string()));
        assert_eq!(canonical_country_code("LKA"), None);
        assert_eq!(canonical_country_code("9"), None);
        assert_eq!(canonical_country_code(""), None);
    }

    #[test]
    fn super_admin_is_global_unless_filtering() {
        let user = admin(Role::SuperAdmin, None);
        assert_eq!(CountryScope::for_user(&user, None).unwrap(), CountryScope::Global);
        assert_eq!(
            CountryScope::for_user(&user, Some("in")).unwrap(),
            CountryScope::Country("IN".into())
        );
        assert!(CountryScope::for_user(&user, Some("India")).is_err());
    }

    #[test]
    fn country_admin_is_pinned_to_own_country() {
        let user = admin(Role::CountryAdmin, Some("LK"));
        let scope = CountryScope::for_user(&user, None).unwrap();
        assert_eq!(scope, CountryScope::Country("LK".into()));
        assert!(scope.allows("lk"));
        assert!(!scope.allows("IN"));

        assert_eq!(
            CountryScope::for_user(&user, Some("lk")).unwrap(),
            CountryScope::Country("LK".into())
        );
        let err = CountryScope::for_user(&user, Some("IN")).unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[test]
    fn reads_outside_scope_are_404_and_writes_403() {
        let scope = CountryScope::Country("LK".into());
        assert_eq!(scope.ensure_visible("IN", "Verification").unwrap_err().status_code(), 404);
        assert_eq!(scope.ensure_mutable("IN").unwrap_err().status_code(), 403);
        assert!(scope.ensure_mutable("LK").is_ok());
    }

    #[test]
    fn plain_users_have_no_admin_scope() {
        let user = admin(Role::User, Some("LK"));
        assert!(CountryScope::for_user(&user, None).is_err());
    }
}
