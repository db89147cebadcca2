/// Configuration file and environment defaults
use anyhow::Context;
use earmark_core::EarmarkError;
use earmark_playback::{FlipStyle, RestartMode};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Most trials a session may ask for
pub const MAX_TRIALS: usize = 50;

/// File name looked up in the working directory and the user config dir
pub const CONFIG_FILE: &str = "earmark.toml";

/// Defaults that command-line flags override
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CliConfig {
    /// Flip style at session start
    pub flip_style: FlipStyle,

    /// Restart mode at session start
    pub restart: RestartMode,

    /// Trials per session
    pub trials: usize,

    /// Output device selector
    pub device: Option<String>,

    /// Show the running score
    pub running_score: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            flip_style: FlipStyle::Seamless,
            restart: RestartMode::None,
            trials: 10,
            device: None,
            running_score: false,
        }
    }
}

impl CliConfig {
    /// Load from the standard locations and `EARMARK_*` variables
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::search_paths(), None)
    }

    /// Config files in increasing precedence: the user's, then the
    /// working directory's
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("earmark").join(CONFIG_FILE));
        }
        paths.push(PathBuf::from(CONFIG_FILE));
        paths
    }

    /// Load from `files` (missing ones are skipped), then the environment
    ///
    /// `env` replaces the process environment when given.
    pub fn load_from(
        files: &[PathBuf],
        env: Option<config::Map<String, String>>,
    ) -> anyhow::Result<Self> {
        let mut settings = config::Config::builder();

        for path in files {
            settings = settings.add_source(config::File::from(path.as_path()).required(false));
        }

        // Override with environment variables (prefixed with EARMARK_)
        settings = settings.add_source(
            config::Environment::with_prefix("EARMARK")
                .try_parsing(true)
                .source(env),
        );

        settings
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("invalid configuration")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), EarmarkError> {
        if !(1..=MAX_TRIALS).contains(&self.trials) {
            return Err(EarmarkError::usage(format!(
                "trials must be between 1 and {MAX_TRIALS}, got {}",
                self.trials
            )));
        }
        Ok(())
    }
}
