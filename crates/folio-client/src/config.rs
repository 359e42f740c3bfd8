//! Folio Client Configuration
//!
//! Connection URIs and client settings.
//!
//! @version 0.1.0
//! @author Folio Development Team

use crate::error::ClientError;
use folio_common::RetryConfig;
use std::fmt;

/// Default port of a `folio://` deployment.
pub const DEFAULT_PORT: u16 = 9090;

// =============================================================================
// Scheme
// =============================================================================

/// How the store is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// `folio://host[:port]`; clients naming the same address share data
    /// for the life of the process.
    Folio,
    /// `mem://`; every client gets a private store.
    Memory,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Folio => "folio",
            Self::Memory => "mem",
        }
    }
}

// =============================================================================
// Client Configuration
// =============================================================================

/// Complete client configuration.
#[derive(Clone)]
pub struct ClientConfig {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
    /// Database named in the URI path, if any.
    pub database: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Query-string options in URI order.
    pub options: Vec<(String, String)>,
    pub retry: RetryConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            scheme: Scheme::Memory,
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            database: None,
            username: None,
            password: None,
            options: Vec::new(),
            retry: RetryConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Parse configuration from a URL.
    ///
    /// Accepts `folio://[user[:password]@]host[:port][/database][?k=v&...]`
    /// and `mem://[database][?k=v&...]`. The `retries` option overrides the
    /// retry count.
    pub fn from_url(url: &str) -> Result<Self, ClientError> {
        let (scheme, rest) = url
            .split_once("://")
            .ok_or_else(|| ClientError::InvalidUrl(format!("missing scheme in '{}'", url)))?;

        let scheme = match scheme {
            "folio" => Scheme::Folio,
            "mem" => Scheme::Memory,
            other => return Err(ClientError::UnsupportedScheme(other.to_string())),
        };

        let (rest, query) = rest.split_once('?').unwrap_or((rest, ""));
        let options = parse_options(query)?;

        let mut config = match scheme {
            Scheme::Memory => Self {
                database: non_empty(rest.trim_matches('/')),
                ..Default::default()
            },
            Scheme::Folio => Self::parse_authority(rest)?,
        };
        config.scheme = scheme;

        for (key, value) in &options {
            if key == "retries" {
                config.retry.max_retries = value
                    .parse()
                    .map_err(|_| ClientError::InvalidUrl(format!("invalid retries '{}'", value)))?;
            }
        }
        config.options = options;

        Ok(config)
    }

    fn parse_authority(rest: &str) -> Result<Self, ClientError> {
        let (auth_host, path) = rest.split_once('/').unwrap_or((rest, ""));

        let (auth, host_port) = match auth_host.rsplit_once('@') {
            Some((auth, host_port)) => (Some(auth), host_port),
            None => (None, auth_host),
        };

        let (host, port) = match host_port.split_once(':') {
            Some((host, port)) => {
                let port: u16 = port
                    .parse()
                    .map_err(|_| ClientError::InvalidUrl(format!("invalid port '{}'", port)))?;
                (host, port)
            }
            None => (host_port, DEFAULT_PORT),
        };

        if host.is_empty() {
            return Err(ClientError::InvalidUrl("missing host".to_string()));
        }

        let (username, password) = match auth {
            Some(auth) => match auth.split_once(':') {
                Some((user, pass)) => (non_empty(user), Some(pass.to_string())),
                None => (non_empty(auth), None),
            },
            None => (None, None),
        };

        Ok(Self {
            host: host.to_string(),
            port,
            database: non_empty(path.trim_matches('/')),
            username,
            password,
            ..Default::default()
        })
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Get the host:port address.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The URI with any password masked, for logs.
    pub fn redacted_url(&self) -> String {
        let mut url = format!("{}://", self.scheme.as_str());
        if self.scheme == Scheme::Folio {
            if let Some(ref user) = self.username {
                url.push_str(user);
                if self.password.is_some() {
                    url.push_str(":***");
                }
                url.push('@');
            }
            url.push_str(&self.address());
            url.push('/');
        }
        if let Some(ref db) = self.database {
            url.push_str(db);
        }
        url
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("url", &self.redacted_url())
            .field("options", &self.options)
            .field("retry", &self.retry)
            .finish()
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn parse_options(query: &str) -> Result<Vec<(String, String)>, ClientError> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) if !k.is_empty() => Ok((k.to_string(), v.to_string())),
            _ => Err(ClientError::InvalidUrl(format!("invalid option '{}'", pair))),
        })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
