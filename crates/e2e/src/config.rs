//! Suite configuration
//!
//! Everything the scenarios need from the environment is read exactly once,
//! here, and handed to the runner as a [`SuiteConfig`].

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{E2eError, E2eResult};
use crate::playwright::BrowserKind;

/// Entry point loaded before each scenario.
pub const ENV_URL: &str = "URL";
/// Expected destination after the last step.
pub const ENV_URL_THANKYOU: &str = "URL_THANKYOU";
/// Set by CI providers; switches on scenario retries.
pub const ENV_CI: &str = "CI";
/// Optional override of the per-action timeout.
pub const ENV_TIMEOUT_MS: &str = "STEPPER_TIMEOUT_MS";

const DEFAULT_TIMEOUT_MS: u64 = 20_000;
const CI_RETRIES: u32 = 2;

#[derive(Debug, Clone)]
pub struct SuiteConfig {
    /// URL loaded at the start of every scenario attempt
    pub entry_url: String,

    /// URL the form redirects to after step 5
    pub thank_you_url: String,

    /// Unattended run (retries on, focused runs forbidden)
    pub ci_mode: bool,

    /// Budget for every single wait or assertion
    pub action_timeout: Duration,

    /// Extra attempts per failing scenario
    pub retries: u32,

    /// Browser engine
    pub browser: BrowserKind,

    /// Run without a visible window
    pub headless: bool,

    /// Reports, traces, screenshots and videos
    pub output_dir: PathBuf,
}

impl SuiteConfig {
    /// Build the configuration from the process environment.
    ///
    /// A `.env` file in the working directory is loaded first; variables
    /// already set in the environment win.
    pub fn from_env() -> E2eResult<Self> {
        load_dotenv()?;
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> E2eResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let entry_url = required(&lookup, ENV_URL)?;
        let thank_you_url = required(&lookup, ENV_URL_THANKYOU)?;

        let ci_mode = lookup(ENV_CI)
            .map(|v| !v.is_empty() && v != "0" && !v.eq_ignore_ascii_case("false"))
            .unwrap_or(false);

        let timeout_ms = match lookup(ENV_TIMEOUT_MS) {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                E2eError::Configuration(format!(
                    "Environment variable {} must be a number of milliseconds, got '{}'",
                    ENV_TIMEOUT_MS, raw
                ))
            })?,
            None => DEFAULT_TIMEOUT_MS,
        };

        Ok(Self {
            entry_url,
            thank_you_url,
            ci_mode,
            action_timeout: Duration::from_millis(timeout_ms),
            retries: if ci_mode { CI_RETRIES } else { 0 },
            browser: BrowserKind::default(),
            headless: true,
            output_dir: PathBuf::from("test-results"),
        })
    }

    /// Total attempts a scenario gets before it is reported as failed.
    pub fn max_attempts(&self) -> u32 {
        self.retries + 1
    }
}

/// Load `.env` from the working directory, if there is one.
///
/// A missing file is fine; an unreadable or malformed one is not.
pub fn load_dotenv() -> E2eResult<()> {
    load_dotenv_from(dotenvy::dotenv())
}

fn load_dotenv_from(loaded: dotenvy::Result<PathBuf>) -> E2eResult<()> {
    match loaded {
        Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => return Err(E2eError::Configuration(format!(".env: {}", e))),
    }
    Ok(())
}

fn required<F>(lookup: &F, key: &str) -> E2eResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(E2eError::Configuration(format!(
            "Environment variable {} is not defined",
            key
        ))),
    }
}
