//! Who may use the tool, and who may use the admin features.

use crate::config::AccessConfig;
use crate::error::CoreError;
use crate::model::Principal;
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    /// May open the productivity view and reassign collaborators.
    Admin,
}

/// An admitted principal and its role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub principal: Principal,
    pub role: Role,
}

impl Session {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// # Errors
    ///
    /// [`CoreError::AccessDenied`] for a regular user.
    pub fn require_admin(&self, feature: &'static str) -> Result<(), CoreError> {
        if self.is_admin() {
            return Ok(());
        }
        warn!(email = %self.principal.email, feature, "admin feature refused");
        Err(CoreError::AccessDenied {
            email: self.principal.email.clone(),
            reason: feature,
        })
    }
}

#[derive(Debug, Clone)]
pub struct AccessPolicy {
    suffixes: Vec<String>,
    admins: Vec<String>,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::from_config(&AccessConfig::default())
    }
}

impl AccessPolicy {
    #[must_use]
    pub fn from_config(config: &AccessConfig) -> Self {
        let fold = |values: &[String]| -> Vec<String> {
            values
                .iter()
                .map(|v| v.trim().to_lowercase())
                .filter(|v| !v.is_empty())
                .collect()
        };
        Self {
            suffixes: fold(&config.allowed_email_suffixes),
            admins: fold(&config.admin_emails),
        }
    }

    /// Admit `principal` or refuse it; no session exists on refusal.
    ///
    /// # Errors
    ///
    /// [`CoreError::AccessDenied`] when the e-mail has no allowed suffix.
    pub fn authenticate(&self, principal: Principal) -> Result<Session, CoreError> {
        let email = principal.email.trim().to_lowercase();
        let admitted = email.contains('@')
            && self
                .suffixes
                .iter()
                .any(|suffix| email.ends_with(suffix.as_str()) && email.len() > suffix.len());
        if !admitted {
            warn!(email = %principal.email, "sign-in refused");
            return Err(CoreError::AccessDenied {
                email: principal.email,
                reason: "e-mail domain is not allowed",
            });
        }

        let role = if self.admins.iter().any(|admin| *admin == email) {
            Role::Admin
        } else {
            Role::User
        };
        debug!(email = %principal.email, ?role, "session opened");
        Ok(Session { principal, role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(admins: &[&str]) -> AccessPolicy {
        AccessPolicy::from_config(&AccessConfig {
            admin_emails: admins.iter().map(ToString::to_string).collect(),
            ..AccessConfig::default()
        })
    }

    #[test]
    fn corporate_suffix_is_admitted_as_user() {
        let session = policy(&[])
            .authenticate(Principal::from_email("ana@maida.health"))
            .unwrap();
        assert_eq!(session.role, Role::User);
        assert!(session.require_admin("dashboard").is_err());
    }

    #[test]
    fn foreign_domain_is_refused() {
        let err = policy(&[])
            .authenticate(Principal::from_email("ana@example.com"))
            .unwrap_err();
        assert!(matches!(err, CoreError::AccessDenied { .. }));
    }

    #[test]
    fn bare_suffix_is_not_an_address() {
        assert!(
            policy(&[])
                .authenticate(Principal::from_email("@maida.health"))
                .is_err()
        );
    }

    #[test]
    fn default_policy_knows_the_billing_admins() {
        let policy = AccessPolicy::default();
        let session = policy
            .authenticate(Principal::from_email("Lucas@maida.health"))
            .unwrap();
        assert!(session.is_admin());
        let session = policy
            .authenticate(Principal::from_email("ana@maida.health"))
            .unwrap();
        assert_eq!(session.role, Role::User);
    }

    #[test]
    fn gmail_is_matched_as_a_suffix() {
        let policy = policy(&[]);
        assert!(policy.authenticate(Principal::from_email("ana@gmail.com")).is_ok());
        assert!(
            policy
                .authenticate(Principal::from_email("ana@gmail.com.evil.example"))
                .is_err()
        );
        assert!(
            policy
                .authenticate(Principal::from_email("gmail.fan@example.com"))
                .is_err()
        );
    }

    #[test]
    fn admin_match_ignores_case() {
        let session = policy(&["Chefe@Maida.Health"])
            .authenticate(Principal::from_email("chefe@maida.health"))
            .unwrap();
        assert!(session.is_admin());
        assert!(session.require_admin("assign").is_ok());
    }
}
