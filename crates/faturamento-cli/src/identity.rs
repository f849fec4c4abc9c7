//! Who is running the command.
//!
//! The sign-in step of the web front-end is replaced by a resolution chain:
//! `--email` flag > `FAT_USER_EMAIL` env. The display name follows
//! `--name` flag > `FAT_USER_NAME` env > the e-mail's local part.
//! Read-only maintenance commands (`import`, `completions`) work without one.

use faturamento_core::model::Principal;
use std::env;

pub const EMAIL_ENV: &str = "FAT_USER_EMAIL";
pub const NAME_ENV: &str = "FAT_USER_NAME";

/// Errors from identity resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityError {
    pub message: String,
    pub code: &'static str,
}

impl std::fmt::Display for IdentityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for IdentityError {}

trait EnvReader {
    fn get(&self, key: &str) -> Option<String>;
}

struct RealEnv;

impl EnvReader for RealEnv {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.trim().is_empty())
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn resolve_with(
    email_flag: Option<&str>,
    name_flag: Option<&str>,
    env: &dyn EnvReader,
) -> Option<Principal> {
    let email = non_blank(email_flag).or_else(|| env.get(EMAIL_ENV))?;
    let name = non_blank(name_flag).or_else(|| env.get(NAME_ENV));

    Some(match name {
        Some(name) => Principal::new(email, name),
        None => Principal::from_email(email),
    })
}

/// Resolve the principal, or `None` when no e-mail is available.
pub fn resolve_principal(email_flag: Option<&str>, name_flag: Option<&str>) -> Option<Principal> {
    resolve_with(email_flag, name_flag, &RealEnv)
}

/// Resolve the principal for a command that needs a signed-in user.
///
/// # Errors
///
/// Returns [`IdentityError`] with code `missing_identity` when neither the
/// flag nor the environment names an e-mail.
pub fn require_principal(
    email_flag: Option<&str>,
    name_flag: Option<&str>,
) -> Result<Principal, IdentityError> {
    resolve_principal(email_flag, name_flag).ok_or_else(|| IdentityError {
        message: format!("Sign-in required for this command. Pass --email or set {EMAIL_ENV}."),
        code: "missing_identity",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MockEnv {
        vars: HashMap<String, String>,
    }

    impl MockEnv {
        fn new() -> Self {
            Self {
                vars: HashMap::new(),
            }
        }

        fn var(mut self, key: &str, val: &str) -> Self {
            self.vars.insert(key.to_string(), val.to_string());
            self
        }
    }

    impl EnvReader for MockEnv {
        fn get(&self, key: &str) -> Option<String> {
            self.vars.get(key).filter(|v| !v.trim().is_empty()).cloned()
        }
    }

    #[test]
    fn flag_takes_priority() {
        let env = MockEnv::new().var(EMAIL_ENV, "env@maida.health");
        let p = resolve_with(Some("flag@maida.health"), None, &env).unwrap();
        assert_eq!(p.email, "flag@maida.health");
    }

    #[test]
    fn env_fallback() {
        let env = MockEnv::new()
            .var(EMAIL_ENV, "deise@maida.health")
            .var(NAME_ENV, "Deise Souza");
        let p = resolve_with(None, None, &env).unwrap();
        assert_eq!(p.email, "deise@maida.health");
        assert_eq!(p.display_name, "Deise Souza");
    }

    #[test]
    fn name_defaults_to_local_part() {
        let env = MockEnv::new();
        let p = resolve_with(Some("paulo@maida.health"), None, &env).unwrap();
        assert_eq!(p.display_name, "paulo");
    }

    #[test]
    fn name_flag_beats_env() {
        let env = MockEnv::new().var(NAME_ENV, "From Env");
        let p = resolve_with(Some("k@gmail.com"), Some("Karen"), &env).unwrap();
        assert_eq!(p.display_name, "Karen");
    }

    #[test]
    fn blank_flag_ignored() {
        let env = MockEnv::new().var(EMAIL_ENV, "env@maida.health");
        let p = resolve_with(Some("  "), None, &env).unwrap();
        assert_eq!(p.email, "env@maida.health");
    }

    #[test]
    fn no_email_returns_none() {
        let env = MockEnv::new().var(NAME_ENV, "Nobody");
        assert!(resolve_with(None, None, &env).is_none());
    }

    #[test]
    fn require_succeeds_with_flag() {
        let p = require_principal(Some("ana@maida.health"), Some("ANA")).unwrap();
        assert_eq!(p.display_name, "ANA");
    }
}
