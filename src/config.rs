use serde::{Deserialize, Serialize};

/// Configuration for the impersonation layer
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ImpersonateConfig {
    /// Whether impersonation is enabled at all. When disabled, the HTTP
    /// routes answer 404 and `take` refuses to run.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Session key under which the impersonation record is stored.
    #[serde(default = "default_session_key")]
    pub session_key: String,
    /// Where to redirect after successfully taking an identity.
    #[serde(default = "default_redirect")]
    pub take_redirect_to: String,
    /// Where to redirect after leaving an impersonation session.
    #[serde(default = "default_redirect")]
    pub leave_redirect_to: String,
}

fn default_enabled() -> bool {
    true
}

fn default_session_key() -> String {
    "impersonated_by".to_string()
}

fn default_redirect() -> String {
    "/".to_string()
}

impl Default for ImpersonateConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            session_key: default_session_key(),
            take_redirect_to: default_redirect(),
            leave_redirect_to: default_redirect(),
        }
    }
}

impl ImpersonateConfig {
    /// Create a config with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for fluent configuration
    #[must_use]
    pub fn builder() -> ImpersonateConfigBuilder {
        ImpersonateConfigBuilder::new()
    }

    /// Load configuration from `MASQUERADE_*` environment variables,
    /// falling back to defaults for anything unset.
    ///
    /// - `MASQUERADE_ENABLED`
    /// - `MASQUERADE_SESSION_KEY`
    /// - `MASQUERADE_TAKE_REDIRECT_TO`
    /// - `MASQUERADE_LEAVE_REDIRECT_TO`
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(enabled) = std::env::var("MASQUERADE_ENABLED") {
            config.enabled = enabled.parse().unwrap_or(config.enabled);
        }
        if let Ok(key) = std::env::var("MASQUERADE_SESSION_KEY") {
            config.session_key = key;
        }
        if let Ok(path) = std::env::var("MASQUERADE_TAKE_REDIRECT_TO") {
            config.take_redirect_to = path;
        }
        if let Ok(path) = std::env::var("MASQUERADE_LEAVE_REDIRECT_TO") {
            config.leave_redirect_to = path;
        }

        config
    }
}

/// Builder for [`ImpersonateConfig`]
#[derive(Debug, Clone, Default)]
pub struct ImpersonateConfigBuilder {
    config: ImpersonateConfig,
}

impl ImpersonateConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    #[must_use]
    pub fn session_key(mut self, key: impl Into<String>) -> Self {
        self.config.session_key = key.into();
        self
    }

    #[must_use]
    pub fn take_redirect_to(mut self, path: impl Into<String>) -> Self {
        self.config.take_redirect_to = path.into();
        self
    }

    #[must_use]
    pub fn leave_redirect_to(mut self, path: impl Into<String>) -> Self {
        self.config.leave_redirect_to = path.into();
        self
    }

    #[must_use]
    pub fn build(self) -> ImpersonateConfig {
        self.config
    }
}
