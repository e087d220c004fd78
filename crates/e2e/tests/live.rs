//! Built-in scenarios against the hosted form in a real browser
//!
//! Needs `URL`, `URL_THANKYOU` and an installed Playwright:
//! cargo test --package stepper-e2e --test live -- --ignored

use std::sync::Arc;

use stepper_e2e::playwright::{PlaywrightConfig, PlaywrightLauncher};
use stepper_e2e::{Fixture, Scenario, SuiteConfig, TestRunner};

#[tokio::test]
#[ignore = "drives a real browser against the hosted form"]
async fn builtin_scenarios_against_live_form() {
    let config = match SuiteConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("skipping live run: {}", e);
            return;
        }
    };

    let launcher = PlaywrightLauncher::new(PlaywrightConfig {
        browser: config.browser,
        headless: config.headless,
        action_timeout: config.action_timeout,
        artifact_dir: config.output_dir.join("artifacts"),
        ..Default::default()
    })
    .expect("playwright installed");

    let fixture = Arc::new(Fixture::builtin().unwrap());
    let runner = TestRunner::new(config, fixture, Arc::new(launcher));
    runner.preflight().await.unwrap();

    let scenarios = Scenario::builtin().unwrap();
    let suite = runner.run_all(&scenarios).await;
    runner.write_results(&suite).unwrap();

    let failures: Vec<_> = suite
        .results
        .iter()
        .filter(|r| !r.success)
        .map(|r| format!("{}: {}", r.name, r.error.as_deref().unwrap_or("?")))
        .collect();
    assert!(failures.is_empty(), "{:#?}", failures);
}
