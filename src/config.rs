use url::Url;

use crate::error::Error;

const DEFAULT_API_URL: &str = "https://backend-seguridad-gzhy.onrender.com";
const DEFAULT_RATE_LIMIT_URL: &str = "https://back-ratelimit.onrender.com";

/// Backend addresses used by the client.
///
/// All fields have defaults pointing at the hosted services; override them via
/// chaining or [`from_env()`](ClientConfig::from_env).
///
/// ```rust,ignore
/// use authcode_client::ClientConfig;
///
/// let config = ClientConfig::new()
///     .with_api_url("http://localhost:3000".parse()?);
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ClientConfig {
    pub(crate) api_url: Url,
    pub(crate) rate_limit_url: Url,
    pub(crate) notify_url: Option<Url>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientConfig {
    /// Create a configuration pointing at the default hosted backends.
    #[must_use]
    pub fn new() -> Self {
        Self {
            api_url: DEFAULT_API_URL.parse().expect("valid default URL"),
            rate_limit_url: DEFAULT_RATE_LIMIT_URL.parse().expect("valid default URL"),
            notify_url: None,
        }
    }

    /// Create config from environment variables.
    ///
    /// # Optional env vars
    /// - `AUTHCODE_API_URL`: Authentication/security backend
    /// - `AUTHCODE_RATE_LIMIT_URL`: Rate-limit backend (log stats only)
    /// - `AUTHCODE_NOTIFY_URL`: Realtime channel address (defaults to the API URL)
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a variable is set but is not a valid URL.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let parse = |key: &str| -> Result<Option<Url>, Error> {
            lookup(key)
                .map(|value| {
                    value
                        .parse::<Url>()
                        .map_err(|e| Error::Config(format!("{key}: {e}")))
                })
                .transpose()
        };

        let mut config = Self::new();
        if let Some(url) = parse("AUTHCODE_API_URL")? {
            config = config.with_api_url(url);
        }
        if let Some(url) = parse("AUTHCODE_RATE_LIMIT_URL")? {
            config = config.with_rate_limit_url(url);
        }
        if let Some(url) = parse("AUTHCODE_NOTIFY_URL")? {
            config = config.with_notify_url(url);
        }
        Ok(config)
    }

    /// Override the authentication/security backend.
    #[must_use]
    pub fn with_api_url(mut self, url: Url) -> Self {
        self.api_url = url;
        self
    }

    /// Override the rate-limit backend.
    #[must_use]
    pub fn with_rate_limit_url(mut self, url: Url) -> Self {
        self.rate_limit_url = url;
        self
    }

    /// Override the realtime channel address.
    #[must_use]
    pub fn with_notify_url(mut self, url: Url) -> Self {
        self.notify_url = Some(url);
        self
    }

    #[must_use]
    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    #[must_use]
    pub fn rate_limit_url(&self) -> &Url {
        &self.rate_limit_url
    }

    /// Realtime channel address. Falls back to the API URL.
    #[must_use]
    pub fn notify_url(&self) -> &Url {
        self.notify_url.as_ref().unwrap_or(&self.api_url)
    }
}

/// Joins `path` onto `base`, keeping any path prefix `base` already has.
pub(crate) fn endpoint(base: &Url, path: &str) -> Result<Url, Error> {
    let mut url = base.clone();
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|()| Error::Config(format!("{base} cannot be a base URL")))?;
        segments.pop_if_empty();
        segments.extend(path.split('/').filter(|s| !s.is_empty()));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new();
        assert_eq!(
            config.api_url().as_str(),
            "https://backend-seguridad-gzhy.onrender.com/"
        );
        assert_eq!(
            config.rate_limit_url().as_str(),
            "https://back-ratelimit.onrender.com/"
        );
        assert_eq!(config.notify_url(), config.api_url());
    }

    #[test]
    fn test_with_overrides() {
        let config = ClientConfig::new()
            .with_api_url("http://localhost:3000".parse().unwrap())
            .with_notify_url("http://localhost:4000".parse().unwrap());

        assert_eq!(config.api_url().as_str(), "http://localhost:3000/");
        assert_eq!(config.notify_url().as_str(), "http://localhost:4000/");
    }

    #[test]
    fn test_from_lookup() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("AUTHCODE_API_URL", "http://api.local"),
            ("AUTHCODE_RATE_LIMIT_URL", "http://rate.local"),
        ]);
        let config = ClientConfig::from_lookup(|k| env.get(k).map(|v| (*v).to_owned())).unwrap();

        assert_eq!(config.api_url().as_str(), "http://api.local/");
        assert_eq!(config.rate_limit_url().as_str(), "http://rate.local/");
        assert_eq!(config.notify_url().as_str(), "http://api.local/");
    }

    #[test]
    fn test_from_lookup_invalid_url() {
        let err = ClientConfig::from_lookup(|k| {
            (k == "AUTHCODE_NOTIFY_URL").then(|| "not a url".to_owned())
        })
        .unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.starts_with("AUTHCODE_NOTIFY_URL")));
    }

    #[test]
    fn test_endpoint_join() {
        let base: Url = "http://host/api/".parse().unwrap();
        assert_eq!(endpoint(&base, "/logs/stats").unwrap().as_str(), "http://host/api/logs/stats");

        let base: Url = "http://host".parse().unwrap();
        assert_eq!(endpoint(&base, "login").unwrap().as_str(), "http://host/login");
    }
}
