use crate::error::Error;

/// Minimum password length accepted by the registration form.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Validates the `local@domain.tld` shape of an email address.
///
/// A valid address:
/// - Contains no whitespace
/// - Has exactly one `@` with a non-empty local part
/// - Has a domain with a `.` that is neither its first nor its last character
#[must_use]
pub fn is_valid_email(s: &str) -> bool {
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

/// Lowercases and trims an email address before it is sent.
#[must_use]
pub fn normalize_email(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Trims a username before it is sent.
#[must_use]
pub fn normalize_username(s: &str) -> String {
    s.trim().to_owned()
}

/// Local checks performed before any registration request.
///
/// The email is checked as given; surrounding whitespace makes it invalid.
/// Normalization happens only when the request is built.
///
/// # Errors
///
/// Returns `Error::Validation` if a field is empty or the email is malformed.
pub fn validate_registration(email: &str, username: &str, password: &str) -> Result<(), Error> {
    if email.is_empty() || username.trim().is_empty() || password.is_empty() {
        return Err(Error::Validation("All fields are required".into()));
    }
    if !is_valid_email(email) {
        return Err(Error::Validation("Invalid email format".into()));
    }
    Ok(())
}

/// Registration form input, including the password confirmation field.
#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub email: String,
    pub username: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegistrationForm {
    #[must_use]
    pub fn new(
        email: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        confirm_password: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            username: username.into(),
            password: password.into(),
            confirm_password: confirm_password.into(),
        }
    }

    /// Runs the form-level checks on top of [`validate_registration`].
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` describing the first failed check.
    pub fn validate(&self) -> Result<(), Error> {
        if self.confirm_password.is_empty() {
            return Err(Error::Validation("All fields are required".into()));
        }
        validate_registration(&self.email, &self.username, &self.password)?;
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::Validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if self.password != self.confirm_password {
            return Err(Error::Validation("Passwords do not match".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_email() {
        assert!(is_valid_email("a@b.com"));
        assert!(is_valid_email("first.last@mail.example.org"));
        assert!(is_valid_email("x@y.z"));
    }

    #[test]
    fn test_invalid_email_shape() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("ab.com"));
        assert!(!is_valid_email("@b.com"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a@.com"));
        assert!(!is_valid_email("a@b."));
        assert!(!is_valid_email("a@b@c.com"));
    }

    #[test]
    fn test_invalid_email_whitespace() {
        assert!(!is_valid_email("a b@c.com"));
        assert!(!is_valid_email("a@c.com "));
    }

    #[test]
    fn test_normalization() {
        assert_eq!(normalize_email("  Ana@Example.COM "), "ana@example.com");
        assert_eq!(normalize_username("  ana  "), "ana");
    }

    #[test]
    fn test_validate_registration_requires_all_fields() {
        assert!(matches!(
            validate_registration("a@b.com", "", "secret1"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            validate_registration("a@b.com", "   ", "secret1"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            validate_registration("", "bob", "secret1"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            validate_registration("a@b.com", "bob", ""),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_validate_registration_email() {
        let err = validate_registration("not-an-email", "bob", "secret1").unwrap_err();
        assert_eq!(err.to_string(), "Invalid email format");
        assert!(validate_registration("A@B.com", "bob", "secret1").is_ok());

        for padded in [" a@b.com ", " a@b.com", "a@b.com\n", "   "] {
            let err = validate_registration(padded, "bob", "secret1").unwrap_err();
            assert_eq!(err.to_string(), "Invalid email format", "{padded:?}");
        }
        let padded = RegistrationForm::new(" a@b.com", "bob", "secret1", "secret1");
        assert_eq!(padded.validate().unwrap_err().to_string(), "Invalid email format");
    }

    #[test]
    fn test_form_password_rules() {
        let short = RegistrationForm::new("a@b.com", "bob", "12345", "12345");
        assert!(short.validate().unwrap_err().to_string().contains("at least 6"));

        let mismatch = RegistrationForm::new("a@b.com", "bob", "secret1", "secret2");
        assert_eq!(mismatch.validate().unwrap_err().to_string(), "Passwords do not match");

        let missing = RegistrationForm::new("a@b.com", "bob", "secret1", "");
        assert_eq!(missing.validate().unwrap_err().to_string(), "All fields are required");

        let ok = RegistrationForm::new("a@b.com", "bob", "secret1", "secret1");
        assert!(ok.validate().is_ok());
    }
}
