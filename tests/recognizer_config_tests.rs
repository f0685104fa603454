// Validation tests for recognizer configuration: bad values must be rejected
// at the setter, not deferred to connection time.

use speechflow::{Authorization, RecognizerConfig, SessionError};

#[test]
fn test_subscription_constructor_stores_key_and_region() {
    let config = RecognizerConfig::from_subscription("my-key", "westus2");
    assert!(matches!(
        config.auth(),
        Authorization::SubscriptionKey(key) if key == "my-key"
    ));
    assert_eq!(config.region(), Some("westus2"));
    assert_eq!(config.endpoint(), None);
    assert_eq!(config.language(), "en-US");
}

#[test]
fn test_token_constructor_rejects_empty_token() {
    let result = RecognizerConfig::from_auth_token("", "westus");
    assert!(matches!(result, Err(SessionError::Configuration(_))));

    let result = RecognizerConfig::from_auth_token("   ", "westus");
    assert!(matches!(result, Err(SessionError::Configuration(_))));
}

#[test]
fn test_token_constructor_accepts_valid_token() {
    let config = RecognizerConfig::from_auth_token("eyJ0b2tlbiI6MX0", "westus").unwrap();
    assert!(matches!(
        config.auth(),
        Authorization::Token(token) if token == "eyJ0b2tlbiI6MX0"
    ));
}

#[test]
fn test_set_auth_token_replaces_subscription_key() {
    let mut config = RecognizerConfig::from_subscription("my-key", "westus");
    config.set_auth_token("fresh-token").unwrap();
    assert!(matches!(config.auth(), Authorization::Token(_)));

    // An empty replacement is rejected and leaves the credential untouched.
    assert!(config.set_auth_token("").is_err());
    assert!(matches!(
        config.auth(),
        Authorization::Token(token) if token == "fresh-token"
    ));
}

#[test]
fn test_endpoint_constructor_clears_region() {
    let config = RecognizerConfig::from_endpoint("wss://example.test/speech", "my-key");
    assert_eq!(config.endpoint(), Some("wss://example.test/speech"));
    assert_eq!(config.region(), None);
}

#[test]
fn test_proxy_rejects_blank_host() {
    let mut config = RecognizerConfig::from_subscription("my-key", "westus");
    let result = config.set_proxy("  ", 8080, None, None);
    assert!(matches!(result, Err(SessionError::Configuration(_))));
    assert!(config.proxy().is_none());
}

#[test]
fn test_proxy_rejects_zero_port() {
    let mut config = RecognizerConfig::from_subscription("my-key", "westus");
    let result = config.set_proxy("proxy.example.test", 0, None, None);
    assert!(matches!(result, Err(SessionError::Configuration(_))));
    assert!(config.proxy().is_none());
}

#[test]
fn test_proxy_stores_valid_settings() {
    let mut config = RecognizerConfig::from_subscription("my-key", "westus");
    config
        .set_proxy(
            "proxy.example.test",
            8080,
            Some("user".to_string()),
            Some("pass".to_string()),
        )
        .unwrap();

    let proxy = config.proxy().unwrap();
    assert_eq!(proxy.host, "proxy.example.test");
    assert_eq!(proxy.port, 8080);
    assert_eq!(proxy.username.as_deref(), Some("user"));
}

#[test]
fn test_property_overrides() {
    let mut config = RecognizerConfig::from_subscription("my-key", "westus");
    assert_eq!(config.property("punctuation"), None);

    config.set_property("punctuation", "explicit");
    config.set_property("punctuation", "none");
    assert_eq!(config.property("punctuation"), Some("none"));

    config.set_language("de-DE");
    config.set_endpoint_id("custom-model-1");
    assert_eq!(config.language(), "de-DE");
    assert_eq!(config.endpoint_id(), Some("custom-model-1"));
}
