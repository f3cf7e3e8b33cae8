//! Engine Configuration
//!
//! The four flags recognized by the evaluation core, loadable from:
//! - `engine.toml` (default configuration)
//! - `engine.local.toml` (git-ignored local overrides)
//! - Environment variables (`ENGINE_*` prefix)
//!
//! ## Example
//!
//! ```toml
//! # engine.toml
//! enable_lazy_load = true
//! enable_logical_pruning = true
//! enable_mvcc = true
//! chunk_size = 1024
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! ENGINE_CHUNK_SIZE=4096
//! ENGINE_ENABLE_MVCC=false
//! ```

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Flags recognized by the evaluation core (§6 of the design).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Allow Compute/Filter to defer column reads to the first expression
    /// that actually needs them.
    #[serde(default = "default_true")]
    pub enable_lazy_load: bool,

    /// Allow `And`/`Or` to skip evaluating their right operand when the
    /// left operand already determines the result.
    #[serde(default = "default_true")]
    pub enable_logical_pruning: bool,

    /// Include the Validate (MVCC) operator in the chain.
    #[serde(default = "default_true")]
    pub enable_mvcc: bool,

    /// Output chunk rowcount target.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,
}

fn default_true() -> bool {
    true
}

fn default_chunk_size() -> u32 {
    1024
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            enable_lazy_load: true,
            enable_logical_pruning: true,
            enable_mvcc: true,
            chunk_size: 1024,
        }
    }
}

impl EngineConfig {
    /// Loads configuration from `engine.toml`, `engine.local.toml`, and
    /// `ENGINE_*` environment variables, in that order of precedence.
    pub fn load() -> Result<Self, figment::Error> {
        Figment::from(figment::providers::Serialized::defaults(
            EngineConfig::default(),
        ))
        .merge(Toml::file("engine.toml"))
        .merge(Toml::file("engine.local.toml"))
        .merge(Env::prefixed("ENGINE_"))
        .extract()
    }
}
