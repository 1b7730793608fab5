// API key lookup
//
// Keys come from environment variables only (headless tool):
// 1. TABLEPILOT_<PROVIDER>_KEY
// 2. <PROVIDER>_API_KEY (conventional provider variable)
//
// Keys are NEVER stored in settings.json

use std::env;

/// Source of an API key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// Tool-specific environment variable
    Environment,
    /// Provider-conventional environment variable
    ProviderEnvironment,
    /// No key found
    None,
}

impl KeySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeySource::Environment => "environment",
            KeySource::ProviderEnvironment => "provider environment",
            KeySource::None => "none",
        }
    }
}

/// Result of key lookup
#[derive(Debug, Clone)]
pub struct KeyLookup {
    pub key: Option<String>,
    pub source: KeySource,
}

/// Get the tool-specific environment variable name for a provider
fn env_var_name(provider: &str) -> String {
    format!("TABLEPILOT_{}_KEY", provider.to_uppercase())
}

/// Get the provider-conventional environment variable name
fn provider_var_name(provider: &str) -> String {
    format!("{}_API_KEY", provider.to_uppercase())
}

/// Get an API key for the specified provider
pub fn get_api_key(provider: &str) -> KeyLookup {
    if let Ok(key) = env::var(env_var_name(provider)) {
        if !key.is_empty() {
            return KeyLookup {
                key: Some(key),
                source: KeySource::Environment,
            };
        }
    }

    if let Ok(key) = env::var(provider_var_name(provider)) {
        if !key.is_empty() {
            return KeyLookup {
                key: Some(key),
                source: KeySource::ProviderEnvironment,
            };
        }
    }

    KeyLookup {
        key: None,
        source: KeySource::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_names() {
        assert_eq!(env_var_name("mistral"), "TABLEPILOT_MISTRAL_KEY");
        assert_eq!(provider_var_name("mistral"), "MISTRAL_API_KEY");
    }

    #[test]
    fn test_lookup_priority() {
        // Use an improbable provider name to avoid clashing with real env
        let provider = "tp_test_provider";
        env::remove_var(env_var_name(provider));
        env::remove_var(provider_var_name(provider));

        let lookup = get_api_key(provider);
        assert!(lookup.key.is_none());
        assert_eq!(lookup.source, KeySource::None);

        env::set_var(provider_var_name(provider), "prov-key");
        let lookup = get_api_key(provider);
        assert_eq!(lookup.key.as_deref(), Some("prov-key"));
        assert_eq!(lookup.source, KeySource::ProviderEnvironment);

        // Tool-specific variable wins
        env::set_var(env_var_name(provider), "tool-key");
        let lookup = get_api_key(provider);
        assert_eq!(lookup.key.as_deref(), Some("tool-key"));
        assert_eq!(lookup.source, KeySource::Environment);

        env::remove_var(env_var_name(provider));
        env::remove_var(provider_var_name(provider));
    }
}
