//! Run configuration
//!
//! [`RunDefaults`] are declared once per schema; [`RunConfig`] carries the
//! optional per-run overrides passed to `Document::run_with`. Both are serde
//! types so they can be loaded from configuration files.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_MAX_ATTEMPTS;

/// Fully resolved settings for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RunDefaults {
    /// Replicate to the mirror document, when the schema declares one
    pub mirror: bool,
    /// Upper bound on transaction attempts, including the first
    pub max_attempts: u32,
    /// Run the schema validator before every create or update write
    pub auto_validate: bool,
    /// Read the document even when nothing else needs a read, and re-read it
    /// after a create to pick up server timestamps
    pub force_get: bool,
}

impl Default for RunDefaults {
    fn default() -> Self {
        Self {
            mirror: true,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            auto_validate: true,
            force_get: false,
        }
    }
}

/// Per-run overrides. Unset fields fall back to the schema's [`RunDefaults`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RunConfig {
    pub mirror: Option<bool>,
    pub max_attempts: Option<u32>,
    pub force_get: Option<bool>,
    pub auto_validate: Option<bool>,
}

impl RunConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mirror(mut self, mirror: bool) -> Self {
        self.mirror = Some(mirror);
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn force_get(mut self, force_get: bool) -> Self {
        self.force_get = Some(force_get);
        self
    }

    pub fn auto_validate(mut self, auto_validate: bool) -> Self {
        self.auto_validate = Some(auto_validate);
        self
    }

    /// Resolves these overrides against `defaults`. At least one attempt is always made.
    pub fn merged_over(&self, defaults: &RunDefaults) -> RunDefaults {
        RunDefaults {
            mirror: self.mirror.unwrap_or(defaults.mirror),
            max_attempts: self.max_attempts.unwrap_or(defaults.max_attempts).max(1),
            auto_validate: self.auto_validate.unwrap_or(defaults.auto_validate),
            force_get: self.force_get.unwrap_or(defaults.force_get),
        }
    }
}
