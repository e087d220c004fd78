//! Scenario runner: sessions, retries and the results report

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::browser::{Browser, Launcher};
use crate::config::SuiteConfig;
use crate::error::{E2eError, E2eResult};
use crate::fixture::Fixture;
use crate::pages::PageManager;
use crate::scenario::{Action, Scenario, ScenarioStep};
use crate::step::{FieldName, Step};

const PREFLIGHT_TIMEOUT: Duration = Duration::from_secs(15);

/// Result of executing a single scenario step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Result of running a single scenario, after retries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub success: bool,
    pub attempts: u32,
    pub duration_ms: u64,
    /// Steps of the last attempt
    pub steps: Vec<StepResult>,
    /// Failure artifacts of every failed attempt
    pub artifacts: Vec<PathBuf>,
    pub error: Option<String>,
}

/// Result of running all scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub started_at: DateTime<Utc>,
    pub results: Vec<ScenarioResult>,
}

impl TestSuiteResult {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

struct Attempt {
    steps: Vec<StepResult>,
    artifacts: Vec<PathBuf>,
    error: Option<E2eError>,
}

/// Runs scenarios one at a time, each attempt in a fresh session
pub struct TestRunner {
    config: SuiteConfig,
    fixture: Arc<Fixture>,
    launcher: Arc<dyn Launcher>,
}

impl TestRunner {
    pub fn new(config: SuiteConfig, fixture: Arc<Fixture>, launcher: Arc<dyn Launcher>) -> Self {
        Self {
            config,
            fixture,
            launcher,
        }
    }

    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    /// Make sure the entry URL answers before any browser is started.
    pub async fn preflight(&self) -> E2eResult<()> {
        let url = &self.config.entry_url;
        debug!("Preflight GET {}", url);

        let client = reqwest::Client::builder()
            .timeout(PREFLIGHT_TIMEOUT)
            .build()?;

        let response = client.get(url).send().await.map_err(|e| {
            E2eError::Navigation(format!("{} is not reachable: {}", url, e))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(E2eError::Navigation(format!("{} answered {}", url, status)));
        }

        info!("Entry page reachable ({})", status);
        Ok(())
    }

    /// Run every scenario in order.
    pub async fn run_all(&self, scenarios: &[Scenario]) -> TestSuiteResult {
        let started_at = Utc::now();
        let start = Instant::now();
        let mut results = Vec::with_capacity(scenarios.len());
        let mut passed = 0;
        let mut failed = 0;
        let skipped = 0;

        info!("Running {} scenario(s)...", scenarios.len());

        for scenario in scenarios {
            let result = self.run_scenario(scenario).await;
            if result.success {
                passed += 1;
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                failed += 1;
                error!(
                    "✗ {} - {}",
                    result.name,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            results.push(result);
        }

        let duration_ms = start.elapsed().as_millis() as u64;

        info!("");
        info!(
            "Test Results: {} passed, {} failed, {} skipped ({} ms)",
            passed, failed, skipped, duration_ms
        );

        TestSuiteResult {
            total: scenarios.len(),
            passed,
            failed,
            skipped,
            duration_ms,
            started_at,
            results,
        }
    }

    /// Run one scenario, retrying the whole of it on failure.
    pub async fn run_scenario(&self, scenario: &Scenario) -> ScenarioResult {
        let start = Instant::now();
        let max_attempts = self.config.max_attempts();
        let mut artifacts = Vec::new();
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!("Running scenario: {} (attempt {}/{})", scenario.name, attempt, max_attempts);

            let outcome = self.run_attempt(scenario, attempt).await;
            artifacts.extend(outcome.artifacts);

            let error = match outcome.error {
                None => {
                    return ScenarioResult {
                        name: scenario.name.clone(),
                        success: true,
                        attempts: attempt,
                        duration_ms: start.elapsed().as_millis() as u64,
                        steps: outcome.steps,
                        artifacts,
                        error: None,
                    };
                }
                Some(e) => e,
            };

            if attempt < max_attempts && error.is_retryable() {
                warn!("{} failed on attempt {}, retrying: {}", scenario.name, attempt, error);
                continue;
            }

            return ScenarioResult {
                name: scenario.name.clone(),
                success: false,
                attempts: attempt,
                duration_ms: start.elapsed().as_millis() as u64,
                steps: outcome.steps,
                artifacts,
                error: Some(error.to_string()),
            };
        }
    }

    async fn run_attempt(&self, scenario: &Scenario, attempt: u32) -> Attempt {
        let label = format!("{}-attempt{}", scenario.name, attempt);

        let browser = match self.launcher.launch(&label).await {
            Ok(browser) => browser,
            Err(e) => {
                return Attempt {
                    steps: Vec::new(),
                    artifacts: Vec::new(),
                    error: Some(e),
                }
            }
        };

        let mut outcome = Attempt {
            steps: Vec::new(),
            artifacts: Vec::new(),
            error: None,
        };

        if let Err(e) = browser.goto(&self.config.entry_url).await {
            outcome.error = Some(e);
        } else {
            let pages = PageManager::new(browser.clone(), self.fixture.clone(), self.config.action_timeout);
            for step in &scenario.steps {
                let step_start = Instant::now();
                let result = self.run_step(&pages, step).await;
                outcome.steps.push(StepResult {
                    name: step.name.clone(),
                    success: result.is_ok(),
                    duration_ms: step_start.elapsed().as_millis() as u64,
                    error: result.as_ref().err().map(|e| e.to_string()),
                });
                if let Err(e) = result {
                    outcome.error = Some(e);
                    break;
                }
            }
        }

        if outcome.error.is_some() {
            outcome.artifacts = self.capture(browser.as_ref(), &label).await;
        }
        if let Err(e) = browser.close().await {
            warn!("Closing session for {} failed: {}", label, e);
        }
        outcome
    }

    async fn run_step(&self, pages: &PageManager, step: &ScenarioStep) -> E2eResult<()> {
        info!("  → {}", step.name);
        for action in &step.actions {
            debug!("    {}", action.label());
            self.execute_action(pages, action).await?;
        }
        Ok(())
    }

    async fn execute_action(&self, pages: &PageManager, action: &Action) -> E2eResult<()> {
        let fixture = pages.fixture();
        let common = pages.on_common_page();
        let stepper = pages.on_stepper_page();

        match action {
            Action::ExpectTitle { step } => pages.expect_title(*step).await,
            Action::ExpectProgress { step } => common.expect_stepper_progress(step.order()).await,
            Action::Fill { field, input } => {
                let value = fixture.input(*input);
                match field {
                    FieldName::Zip => stepper.fill_zip_code(value).await,
                    FieldName::Name => stepper.fill_name(value).await,
                    FieldName::Email => stepper.fill_email(value).await,
                    FieldName::Phone => stepper.fill_phone_number(value).await,
                    FieldName::Checkboxes => Err(E2eError::ScenarioParse(
                        "checkboxes are selected, not filled".to_string(),
                    )),
                }
            }
            Action::SelectCheckbox { checkbox } => {
                stepper.select_checkbox(fixture.checkbox(*checkbox)).await
            }
            Action::Advance { step } => common.click_next_button(fixture.step_key(*step)).await,
            Action::ExpectSuccess { step } => {
                common.expect_step_transition_success(fixture.step_key(*step)).await
            }
            Action::ExpectFailure { step, message } => {
                common
                    .expect_step_transition_failure(fixture.step_key(*step), fixture.message(*message))
                    .await
            }
            Action::NavigateTo { step } => pages.navigate_to(*step).await,
            Action::Complete { step } => pages.complete_step(*step).await,
            Action::ExpectPhoneMaxDigits { max } => stepper.expect_phone_input_max_digits(*max).await,
            Action::ExpectThankYou => pages.expect_thank_you(&self.config.thank_you_url).await,
            Action::Log { message } => {
                info!("[scenario] {}", message);
                Ok(())
            }
        }
    }

    async fn capture(&self, browser: &dyn Browser, label: &str) -> Vec<PathBuf> {
        match browser.capture_failure(label).await {
            Ok(paths) => {
                for path in &paths {
                    info!("Artifact: {}", path.display());
                }
                paths
            }
            Err(e) => {
                warn!("Could not capture failure artifacts for {}: {}", label, e);
                Vec::new()
            }
        }
    }

    /// Write suite results to `<output_dir>/test-results.json`
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        write_results(&self.config.output_dir, results)
    }
}

pub fn write_results(output_dir: &Path, results: &TestSuiteResult) -> E2eResult<PathBuf> {
    std::fs::create_dir_all(output_dir)?;

    let path = output_dir.join("test-results.json");
    let json = serde_json::to_string_pretty(results)?;
    std::fs::write(&path, json)?;

    info!("Results written to: {}", path.display());
    Ok(path)
}

/// Pick the scenarios a run is restricted to.
///
/// Focused runs by name are refused in CI so that a forgotten filter cannot
/// silently shrink the suite. A selection that matches nothing is an error.
pub fn select<'a>(
    scenarios: &'a [Scenario],
    tag: Option<&str>,
    name: Option<&str>,
    ci_mode: bool,
) -> E2eResult<Vec<&'a Scenario>> {
    if let Some(name) = name {
        if ci_mode {
            return Err(E2eError::Configuration(format!(
                "Focused run of '{}' is not allowed in CI",
                name
            )));
        }
        let found: Vec<_> = scenarios.iter().filter(|s| s.name == name).collect();
        if found.is_empty() {
            return Err(E2eError::Configuration(format!("Scenario not found: {}", name)));
        }
        return Ok(found);
    }

    let selected = match tag {
        Some(tag) => Scenario::filter_by_tag(scenarios, tag),
        None => scenarios.iter().collect(),
    };
    if selected.is_empty() {
        return Err(E2eError::Configuration(match tag {
            Some(tag) => format!("No scenario is tagged '{}'", tag),
            None => "No scenarios to run".to_string(),
        }));
    }
    Ok(selected)
}

/// Steps a scenario drives the form through, for listings.
pub fn steps_touched(scenario: &Scenario) -> Vec<Step> {
    let mut steps: Vec<Step> = scenario
        .actions()
        .filter_map(|action| match action {
            Action::ExpectTitle { step }
            | Action::ExpectProgress { step }
            | Action::Advance { step }
            | Action::ExpectSuccess { step }
            | Action::ExpectFailure { step, .. }
            | Action::NavigateTo { step }
            | Action::Complete { step } => Some(*step),
            Action::Fill { field, .. } => Step::of_field(*field),
            Action::SelectCheckbox { checkbox } => Some(checkbox.step()),
            Action::ExpectPhoneMaxDigits { .. } => Some(Step::Phone),
            Action::ExpectThankYou | Action::Log { .. } => None,
        })
        .collect();
    steps.sort_by_key(|s| s.order());
    steps.dedup();
    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::SimulatedLauncher;
    use std::collections::HashMap;

    const ENTRY: &str = "https://forms.example.com/estimate";
    const THANK_YOU: &str = "https://forms.example.com/thank-you";

    fn config(ci: bool) -> SuiteConfig {
        let mut vars = HashMap::from([
            ("URL", ENTRY),
            ("URL_THANKYOU", THANK_YOU),
            ("STEPPER_TIMEOUT_MS", "50"),
        ]);
        if ci {
            vars.insert("CI", "1");
        }
        SuiteConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap()
    }

    fn runner(ci: bool) -> TestRunner {
        let fixture = Arc::new(Fixture::builtin().unwrap());
        let launcher = Arc::new(SimulatedLauncher::new(fixture.clone(), THANK_YOU));
        TestRunner::new(config(ci), fixture, launcher)
    }

    fn scenario(yaml: &str) -> Scenario {
        Scenario::from_yaml(yaml).unwrap()
    }

    #[tokio::test]
    async fn test_passing_scenario_single_attempt() {
        let s = scenario(
            r#"
name: zip
steps:
  - name: Valid ZIP
    actions:
      - action: complete
        step: step_1
      - action: expect_title
        step: step_2
"#,
        );
        let result = runner(true).run_scenario(&s).await;
        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.attempts, 1);
        assert_eq!(result.steps.len(), 1);
        assert!(result.artifacts.is_empty());
    }

    #[tokio::test]
    async fn test_failing_scenario_is_retried_in_ci() {
        let s = scenario(
            r#"
name: wrong-title
steps:
  - name: Fresh form is not on step 2
    actions:
      - action: expect_title
        step: step_2
  - name: Never reached
    actions:
      - action: log
        message: unreachable
"#,
        );

        let ci = runner(true).run_scenario(&s).await;
        assert!(!ci.success);
        assert_eq!(ci.attempts, 3);
        assert_eq!(ci.steps.len(), 1);
        assert!(ci.error.unwrap().contains("Assertion failed"));

        let local = runner(false).run_scenario(&s).await;
        assert_eq!(local.attempts, 1);
    }

    #[tokio::test]
    async fn test_suite_totals_and_report() {
        let scenarios = vec![
            scenario("name: ok\nsteps:\n  - name: s\n    actions:\n      - action: expect_title\n        step: step_1\n"),
            scenario("name: bad\nsteps:\n  - name: s\n    actions:\n      - action: expect_title\n        step: step_3\n"),
        ];
        let suite = runner(false).run_all(&scenarios).await;
        assert_eq!(suite.total, 2);
        assert_eq!(suite.passed, 1);
        assert_eq!(suite.failed, 1);
        assert!(!suite.success());

        let dir = tempfile::tempdir().unwrap();
        let path = write_results(dir.path(), &suite).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(json["passed"], 1);
        assert_eq!(json["results"][1]["name"], "bad");
        assert!(json["started_at"].is_string());
    }

    #[test]
    fn test_select_forbids_focus_in_ci() {
        let scenarios = Scenario::builtin().unwrap();

        let err = select(&scenarios, None, Some("end-to-end-flow"), true).unwrap_err();
        assert!(matches!(err, E2eError::Configuration(_)));

        let one = select(&scenarios, None, Some("end-to-end-flow"), false).unwrap();
        assert_eq!(one.len(), 1);

        assert!(select(&scenarios, None, Some("nope"), false).is_err());
        assert_eq!(select(&scenarios, None, None, true).unwrap().len(), scenarios.len());
    }

    #[test]
    fn test_empty_selection_is_refused() {
        let scenarios = Scenario::builtin().unwrap();
        assert_eq!(select(&scenarios, Some("validation"), None, true).unwrap().len(), 5);

        let err = select(&scenarios, Some("no-such-tag"), None, true).unwrap_err();
        assert!(err.to_string().contains("no-such-tag"), "{err}");

        let err = select(&[], None, None, false).unwrap_err();
        assert!(matches!(err, E2eError::Configuration(_)));
    }

    #[test]
    fn test_steps_touched() {
        let scenarios = Scenario::builtin().unwrap();
        let e2e = scenarios.iter().find(|s| s.name == "end-to-end-flow").unwrap();
        assert_eq!(steps_touched(e2e), Step::ALL.to_vec());

        let zip = scenarios.iter().find(|s| s.name == "zip-code-validation").unwrap();
        assert_eq!(steps_touched(zip), vec![Step::ZipCode]);
    }
}
