//! Engine configuration.

use std::path::PathBuf;

use serde::Deserialize;

/// Tunables of one engine instance, loadable from the `[engine]` table of a
/// TOML configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Validate every transform's output buffers (NaN/Inf/all-zero checks).
    pub validate_output: bool,

    /// Soft cap on the byte size of a single edge; edges above it are
    /// executed in slices when the transform allows it.
    pub memory_budget: Option<usize>,

    /// Directory for per-transform buffer dumps. Overrides the
    /// `SFE_DUMP_DIR` environment variable; defaults to the working
    /// directory.
    pub dump_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            validate_output: false,
            memory_budget: None,
            dump_dir: None,
        }
    }
}
