//! Error types for the stepper suite

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Fixture invalid: {0}")]
    FixtureInvalid(String),

    #[error("Scenario parse error: {0}")]
    ScenarioParse(String),

    #[error("Control not ready: {control} - {reason}")]
    ControlNotReady { control: String, reason: String },

    #[error("Assertion failed: {context}\n  expected: {expected}\n  actual:   {actual}")]
    AssertionFailed {
        context: String,
        expected: String,
        actual: String,
    },

    #[error("Playwright not found. Install with: npm install playwright && npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl E2eError {
    pub fn assertion(
        context: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        E2eError::AssertionFailed {
            context: context.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Whether a whole-scenario retry can change the outcome.
    ///
    /// Setup errors are deterministic; everything observed in the browser
    /// may be a flake.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            E2eError::Configuration(_)
                | E2eError::FixtureInvalid(_)
                | E2eError::ScenarioParse(_)
                | E2eError::PlaywrightNotFound
        )
    }
}

pub type E2eResult<T> = Result<T, E2eError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assertion_message_carries_expected_and_actual() {
        let err = E2eError::assertion("step-1 title", "What is your ZIP Code?", "Oops");
        let msg = err.to_string();
        assert!(msg.contains("step-1 title"));
        assert!(msg.contains("expected: What is your ZIP Code?"));
        assert!(msg.contains("actual:   Oops"));
    }

    #[test]
    fn test_setup_errors_are_not_retryable() {
        assert!(!E2eError::Configuration("URL".into()).is_retryable());
        assert!(!E2eError::FixtureInvalid("titles".into()).is_retryable());
        assert!(E2eError::Timeout("next button".into()).is_retryable());
        assert!(E2eError::assertion("x", "a", "b").is_retryable());
    }
}
