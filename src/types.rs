use derive_more::{Display, From, Into};
use serde::{Deserialize, Deserializer, Serialize};

/// Opaque bearer credential issued by the server after a successful login.
///
/// The client never inspects it beyond decoding its claims for display,
/// see [`decode_identity`](crate::token::decode_identity).
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, From, Into)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Credential {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// Bearer tokens stay out of logs and panic messages.
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Numeric account identifier, when the server includes one in the token claims.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From, Into,
)]
#[serde(transparent)]
pub struct UserId(pub i64);

/// User-facing claims decoded from a [`Credential`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Identity {
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub id: Option<UserId>,
}

impl Identity {
    #[must_use]
    pub fn new(email: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            username: username.into(),
            id: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<UserId>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Outcome of a successful registration.
///
/// Shown once so the user can configure their authenticator app, then dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct RegistrationResult {
    /// Shared secret for the one-time code generator.
    pub secret_key: String,
    /// Always [`SETUP_INSTRUCTIONS`](crate::session::SETUP_INSTRUCTIONS).
    pub instructions: &'static [&'static str],
}

/// `authCode` event pushed over the realtime channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct NotificationEvent {
    pub message: String,
    #[serde(deserialize_with = "string_or_number")]
    pub code: String,
}

impl NotificationEvent {
    #[must_use]
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
        }
    }

    /// Text shown to the user: the message followed by the code.
    #[must_use]
    pub fn display_text(&self) -> String {
        format!("{}: {}", self.message, self.code)
    }
}

/// Accepts either a JSON string or a JSON number and yields its text form.
///
/// Backends are inconsistent about quoting numeric fields (`"count": "5"` vs `5`).
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
        Uint(u64),
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Str(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Uint(n) => n.to_string(),
        Raw::Float(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_debug_is_redacted() {
        let credential = Credential::from("eyJhbGciOiJIUzI1NiJ9.e30.sig");
        assert_eq!(format!("{credential:?}"), "Credential(***)");
        assert_eq!(credential.as_str(), "eyJhbGciOiJIUzI1NiJ9.e30.sig");
    }

    #[test]
    fn identity_id_is_optional() {
        let identity: Identity =
            serde_json::from_str(r#"{"email":"a@b.com","username":"bob"}"#).unwrap();
        assert_eq!(identity, Identity::new("a@b.com", "bob"));

        let identity: Identity =
            serde_json::from_str(r#"{"email":"a@b.com","username":"bob","id":7,"iat":1}"#)
                .unwrap();
        assert_eq!(identity.id, Some(UserId(7)));
    }

    #[test]
    fn notification_code_accepts_string_or_number() {
        let event: NotificationEvent =
            serde_json::from_str(r#"{"message":"Your code","code":123456}"#).unwrap();
        assert_eq!(event.code, "123456");
        assert_eq!(event.display_text(), "Your code: 123456");

        let event: NotificationEvent =
            serde_json::from_str(r#"{"message":"Your code","code":"004211"}"#).unwrap();
        assert_eq!(event.code, "004211");
    }

    #[test]
    fn notification_missing_code_is_rejected() {
        assert!(serde_json::from_str::<NotificationEvent>(r#"{"message":"hi"}"#).is_err());
    }

    #[test]
    fn user_id_display() {
        assert_eq!(UserId::from(42).to_string(), "42");
    }
}
