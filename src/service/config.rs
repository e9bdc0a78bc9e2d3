use std::path::Path;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::{PresencePolicy, DEFAULT_PARALLEL_THRESHOLD};

/// Prefix for environment overrides, e.g. `RULECHECK_STRICT_PROFILES=true`.
pub const ENV_PREFIX: &str = "RULECHECK_";

/// Profile ids accepted when no pattern is configured.
pub const DEFAULT_PROFILE_PATTERN: &str = "^[A-Za-z0-9_-]+$";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Reported by [`RulesService::index()`](super::RulesService::index).
    pub version: String,
    /// Pattern a profile id must match in full.
    pub profile_pattern: String,
    /// Fail validation of an unknown profile instead of treating it as
    /// having no rules.
    pub strict_profiles: bool,
    pub presence_policy: PresencePolicy,
    pub parallel_threshold: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_owned(),
            profile_pattern: DEFAULT_PROFILE_PATTERN.to_owned(),
            strict_profiles: false,
            presence_policy: PresencePolicy::default(),
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

impl ServiceConfig {
    /// Load configuration, later sources overriding earlier ones:
    ///
    /// 1. built-in defaults
    /// 2. the TOML file at `path`, if given and present
    /// 3. `RULECHECK_`-prefixed environment variables
    ///
    /// # Errors
    ///
    /// Returns the [`figment::Error`] if a source cannot be read or a value
    /// has the wrong type.
    pub fn load(path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            if path.exists() {
                tracing::debug!(path = %path.display(), "loading configuration file");
                figment = figment.merge(Toml::file(path));
            } else {
                tracing::debug!(path = %path.display(), "configuration file not found");
            }
        }
        figment.merge(Env::prefixed(ENV_PREFIX)).extract()
    }
}
