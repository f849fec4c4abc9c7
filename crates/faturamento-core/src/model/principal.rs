use serde::{Deserialize, Serialize};

/// An authenticated person as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub email: String,
    pub display_name: String,
}

impl Principal {
    pub fn new(email: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            display_name: display_name.into(),
        }
    }

    /// Build a principal whose display name is the e-mail's local part.
    pub fn from_email(email: impl Into<String>) -> Self {
        let email = email.into();
        let display_name = email.split('@').next().unwrap_or_default().to_string();
        Self {
            email,
            display_name,
        }
    }
}
