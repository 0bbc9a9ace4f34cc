use std::sync::{PoisonError, RwLock};

use crate::api::{AuthApi, LoginRequest, RegisterRequest};
use crate::error::Error;
use crate::token::decode_identity;
use crate::types::{Credential, Identity, RegistrationResult};
use crate::validate::{RegistrationForm, normalize_email, normalize_username, validate_registration};

/// Steps shown after registration to configure the authenticator app.
///
/// Owned by the registration flow; never taken from the server response.
pub const SETUP_INSTRUCTIONS: &[&str] = &[
    "Download Microsoft Authenticator on your mobile device",
    "Scan the QR code or enter the secret key manually",
    "Once configured, sign in using the generated code",
];

const LOGIN_FAILED: &str = "Login failed";
const AUTHENTICATION_FAILED: &str = "Authentication failed";
const TOKEN_UNREADABLE: &str = "Could not process the authentication token";
const REGISTRATION_FAILED: &str = "Registration failed";
const MISSING_REQUIRED_DATA: &str = "The server did not return the required data";

#[derive(Debug, Clone, PartialEq, Eq)]
struct Authenticated {
    credential: Credential,
    identity: Identity,
}

/// Credential and identity of the signed-in user.
///
/// Either empty, or holding a credential together with the identity decoded
/// from it. There is no way to hold one without the other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    inner: Option<Authenticated>,
}

impl Session {
    /// Build an authenticated session by decoding the credential's claims.
    ///
    /// # Errors
    ///
    /// Returns `Error::Decode` if the claims cannot be decoded.
    pub fn from_credential(credential: Credential) -> Result<Self, Error> {
        let identity = decode_identity(&credential)?;
        Ok(Self {
            inner: Some(Authenticated { credential, identity }),
        })
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.is_some()
    }

    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.inner.as_ref().map(|a| &a.identity)
    }

    #[must_use]
    pub fn credential(&self) -> Option<&Credential> {
        self.inner.as_ref().map(|a| &a.credential)
    }
}

/// Single source of truth for who is signed in.
///
/// Owned by the application and passed by reference to whatever needs it.
/// Every transition replaces the whole [`Session`] under a short write lock,
/// never held across an `.await`.
///
/// Overlapping [`login`](Self::login) calls are not serialized: whichever
/// response arrives last determines the session.
#[derive(Debug)]
pub struct SessionStore<A> {
    api: A,
    session: RwLock<Session>,
}

impl<A: AuthApi> SessionStore<A> {
    #[must_use]
    pub fn new(api: A) -> Self {
        Self {
            api,
            session: RwLock::new(Session::default()),
        }
    }

    /// The backend this store talks to.
    #[must_use]
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Copy of the current session.
    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.read().clone()
    }

    /// True only when a decoded identity is present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.read().is_authenticated()
    }

    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.read().identity().cloned()
    }

    #[must_use]
    pub fn credential(&self) -> Option<Credential> {
        self.read().credential().cloned()
    }

    /// Sign in with email, password and the one-time code from the authenticator app.
    ///
    /// The session changes only when the server returns a credential. If that
    /// credential cannot be decoded the session is cleared.
    ///
    /// # Errors
    ///
    /// Returns `Error::Authentication` for every failure, carrying the server's
    /// message when it sent one.
    pub async fn login(&self, email: &str, password: &str, auth_code: &str) -> Result<(), Error> {
        let request = LoginRequest {
            email: email.to_owned(),
            password: password.to_owned(),
            auth_code: auth_code.to_owned(),
        };

        let response = self.api.login(&request).await.map_err(|e| {
            tracing::warn!(error = %e, "Login request failed");
            Error::Authentication(
                e.server_message().unwrap_or(LOGIN_FAILED).to_owned(),
            )
        })?;

        let Some(token) = response.token.filter(|t| !t.is_empty()) else {
            tracing::warn!("Login response carried no token");
            return Err(Error::Authentication(
                response.message.unwrap_or_else(|| AUTHENTICATION_FAILED.to_owned()),
            ));
        };

        match Session::from_credential(Credential::from(token)) {
            Ok(session) => {
                if let Some(identity) = session.identity() {
                    tracing::info!(username = %identity.username, "Signed in");
                }
                *self.write() = session;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Discarding undecodable credential");
                *self.write() = Session::default();
                Err(Error::Authentication(TOKEN_UNREADABLE.to_owned()))
            }
        }
    }

    /// Create an account. Does not sign in.
    ///
    /// Inputs are checked locally before any request: all fields non-empty and
    /// a `local@domain.tld` email. The email is sent lowercased and trimmed,
    /// the username trimmed.
    ///
    /// # Errors
    ///
    /// - `Error::Validation` for local failures and 4xx rejections
    /// - `Error::Protocol` if the server omits `secretKey`
    /// - `Error::Network` for transport failures and 5xx responses
    pub async fn register(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<RegistrationResult, Error> {
        validate_registration(email, username, password)?;

        let request = RegisterRequest {
            email: normalize_email(email),
            username: normalize_username(username),
            password: password.to_owned(),
        };

        let response = self.api.register(&request).await.map_err(|e| {
            tracing::warn!(error = %e, "Registration request failed");
            registration_error(e)
        })?;

        let secret_key = response
            .secret_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::Protocol(MISSING_REQUIRED_DATA.to_owned()))?;

        tracing::info!(username = %request.username, "Registered account");
        Ok(RegistrationResult {
            secret_key,
            instructions: SETUP_INSTRUCTIONS,
        })
    }

    /// Validate the full registration form (password rules included), then register.
    ///
    /// # Errors
    ///
    /// Same as [`register`](Self::register).
    pub async fn register_form(&self, form: &RegistrationForm) -> Result<RegistrationResult, Error> {
        form.validate()?;
        self.register(&form.email, &form.username, &form.password).await
    }

    /// Forget the credential and identity. Never fails, makes no request.
    pub fn logout(&self) {
        *self.write() = Session::default();
        tracing::debug!("Signed out");
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Session> {
        self.session.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Session> {
        self.session.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(feature = "client")]
impl SessionStore<crate::client::ApiClient> {
    /// Fetch and group log statistics, authenticated with the current credential.
    ///
    /// # Errors
    ///
    /// Propagates [`ApiClient::fetch_log_stats`](crate::client::ApiClient::fetch_log_stats) errors.
    pub async fn log_stats(
        &self,
        source: crate::stats::LogSource,
    ) -> Result<crate::stats::LogStats, Error> {
        let credential = self.credential();
        let records = self.api.fetch_log_stats(source, credential.as_ref()).await?;
        tracing::debug!(source = source.label(), rows = records.len(), "Fetched log stats");
        Ok(crate::stats::group_log_stats(&records))
    }
}

fn registration_error(err: Error) -> Error {
    match err {
        Error::Api {
            status, message, ..
        } if (400..500).contains(&status) => {
            Error::Validation(message.unwrap_or_else(|| REGISTRATION_FAILED.to_owned()))
        }
        Error::Api { message, .. } => {
            Error::Network(message.unwrap_or_else(|| REGISTRATION_FAILED.to_owned()))
        }
        Error::Decode(_) => Error::Protocol(MISSING_REQUIRED_DATA.to_owned()),
        _ => Error::Network(REGISTRATION_FAILED.to_owned()),
    }
}
