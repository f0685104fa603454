use serde::Serialize;
use std::collections::HashMap;

use crate::error::{Result, SessionError};

/// Credential used to authorize against the recognition service.
#[derive(Debug, Clone, Serialize)]
pub enum Authorization {
    /// Long-lived subscription key
    SubscriptionKey(String),
    /// Short-lived authorization token
    Token(String),
}

/// Proxy settings for the backend connection.
#[derive(Debug, Clone, Serialize)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Pass-through configuration handed to the recognition backend.
///
/// Invalid values are rejected at the setter, not at connection time.
#[derive(Debug, Clone, Serialize)]
pub struct RecognizerConfig {
    auth: Authorization,
    region: Option<String>,
    endpoint: Option<String>,
    language: String,
    endpoint_id: Option<String>,
    proxy: Option<ProxyConfig>,
    properties: HashMap<String, String>,
}

impl RecognizerConfig {
    /// Configure with a subscription key and a service region.
    pub fn from_subscription(key: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            auth: Authorization::SubscriptionKey(key.into()),
            region: Some(region.into()),
            endpoint: None,
            language: "en-US".to_string(),
            endpoint_id: None,
            proxy: None,
            properties: HashMap::new(),
        }
    }

    /// Configure with an authorization token and a service region. The token
    /// must be non-empty.
    pub fn from_auth_token(token: impl Into<String>, region: impl Into<String>) -> Result<Self> {
        let mut config = Self::from_subscription(String::new(), region);
        config.set_auth_token(token)?;
        Ok(config)
    }

    /// Configure against an explicit endpoint URI instead of a region.
    pub fn from_endpoint(endpoint: impl Into<String>, key: impl Into<String>) -> Self {
        let mut config = Self::from_subscription(key, String::new());
        config.region = None;
        config.endpoint = Some(endpoint.into());
        config
    }

    /// Replace the credential with an authorization token. Fails immediately
    /// on an empty token.
    pub fn set_auth_token(&mut self, token: impl Into<String>) -> Result<()> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(SessionError::Configuration(
                "authorization token must not be empty".into(),
            ));
        }
        self.auth = Authorization::Token(token);
        Ok(())
    }

    /// Set proxy parameters. Fails immediately on a blank host or a zero
    /// port.
    pub fn set_proxy(
        &mut self,
        host: impl Into<String>,
        port: u16,
        username: Option<String>,
        password: Option<String>,
    ) -> Result<()> {
        let host = host.into();
        if host.trim().is_empty() {
            return Err(SessionError::Configuration(
                "proxy host must not be blank".into(),
            ));
        }
        if port == 0 {
            return Err(SessionError::Configuration(
                "proxy port must be greater than 0".into(),
            ));
        }
        self.proxy = Some(ProxyConfig {
            host,
            port,
            username,
            password,
        });
        Ok(())
    }

    /// Recognition language tag, e.g. "en-US".
    pub fn set_language(&mut self, language: impl Into<String>) {
        self.language = language.into();
    }

    /// Custom model/endpoint identifier.
    pub fn set_endpoint_id(&mut self, endpoint_id: impl Into<String>) {
        self.endpoint_id = Some(endpoint_id.into());
    }

    /// Arbitrary string-keyed property override.
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn auth(&self) -> &Authorization {
        &self.auth
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn endpoint_id(&self) -> Option<&str> {
        self.endpoint_id.as_deref()
    }

    pub fn proxy(&self) -> Option<&ProxyConfig> {
        self.proxy.as_ref()
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}
