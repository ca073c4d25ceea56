//! CLI execution context.

use std::path::{Path, PathBuf};

use adapter_runtime::AdapterConfig;
use anyhow::{Context as _, Result};

use crate::output::Output;

/// Config file names searched from the working directory upwards.
const CONFIG_NAMES: [&str; 3] = ["adapter.toml", ".adapter.toml", "adapter.json"];

/// Execution context for CLI commands.
pub struct Context {
    pub config: AdapterConfig,
    pub output: Output,
    pub cwd: PathBuf,
}

impl Context {
    /// Load the adapter config from `config_path`, or search for one. The
    /// bucket environment overlay is applied either way.
    pub fn load(config_path: Option<&str>, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        let config = match config_path {
            Some(path) => AdapterConfig::load(path)
                .with_context(|| format!("Failed to load config from {}", path))?,
            None => match Self::find_config(&cwd) {
                Some(path) => {
                    output.debug(&format!("Using config {}", path.display()));
                    AdapterConfig::load(&path)
                        .with_context(|| format!("Failed to load config from {}", path.display()))?
                }
                None => AdapterConfig::default(),
            },
        };

        Ok(Self {
            config: config.with_env_overrides(),
            output,
            cwd,
        })
    }

    fn find_config(start: &Path) -> Option<PathBuf> {
        start.ancestors().find_map(|dir| {
            CONFIG_NAMES
                .iter()
                .map(|name| dir.join(name))
                .find(|path| path.is_file())
        })
    }

    /// Resolve a path relative to the working directory.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let path = PathBuf::from(path);
        if path.is_absolute() {
            path
        } else {
            self.cwd.join(path)
        }
    }

    /// Read a JSON document from a file, or stdin when `path` is `-`.
    pub fn read_json(&self, path: &str) -> Result<serde_json::Value> {
        let content = if path == "-" {
            std::io::read_to_string(std::io::stdin()).context("Failed to read stdin")?
        } else {
            let full = self.resolve_path(path);
            std::fs::read_to_string(&full)
                .with_context(|| format!("Failed to read {}", full.display()))?
        };
        serde_json::from_str(&content).context("Input is not valid JSON")
    }
}
