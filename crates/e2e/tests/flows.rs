//! Scenario flows against the in-memory form
//!
//! Run with: cargo test --package stepper-e2e --test flows

use std::sync::Arc;
use std::time::Duration;
use test_case::test_case;

use stepper_e2e::fixture::{CheckboxKey, InputRef, MessageRef};
use stepper_e2e::runner::write_results;
use stepper_e2e::simulator::{SimulatedForm, SimulatedLauncher};
use stepper_e2e::step::FieldName;
use stepper_e2e::{Browser, E2eError, Fixture, PageManager, Scenario, Step, SuiteConfig, TestRunner};

const ENTRY: &str = "https://forms.example.com/estimate";
const THANK_YOU: &str = "https://forms.example.com/thank-you";
const TIMEOUT: Duration = Duration::from_millis(40);

fn fixture() -> Arc<Fixture> {
    Arc::new(Fixture::builtin().unwrap())
}

async fn open_form() -> (Arc<SimulatedForm>, PageManager) {
    let form = Arc::new(SimulatedForm::new(fixture(), THANK_YOU));
    form.goto(ENTRY).await.unwrap();
    let pages = PageManager::new(form.clone(), fixture(), TIMEOUT);
    (form, pages)
}

fn suite_config(ci: bool) -> SuiteConfig {
    SuiteConfig::from_lookup(|key| match key {
        "URL" => Some(ENTRY.to_string()),
        "URL_THANKYOU" => Some(THANK_YOU.to_string()),
        "STEPPER_TIMEOUT_MS" => Some("40".to_string()),
        "CI" if ci => Some("true".to_string()),
        _ => None,
    })
    .unwrap()
}

fn runner(ci: bool) -> TestRunner {
    let fixture = fixture();
    TestRunner::new(
        suite_config(ci),
        fixture.clone(),
        Arc::new(SimulatedLauncher::new(fixture, THANK_YOU)),
    )
}

#[tokio::test]
async fn builtin_scenarios_pass() {
    let scenarios = Scenario::builtin().unwrap();
    let suite = runner(false).run_all(&scenarios).await;

    for result in &suite.results {
        assert!(result.success, "{} failed: {:?}", result.name, result.error);
        assert_eq!(result.attempts, 1);
    }
    assert_eq!(suite.passed, scenarios.len());
    assert!(suite.success());
}

#[test_case(InputRef::ZipEmpty, MessageRef::ZipEmpty ; "empty")]
#[test_case(InputRef::ZipShort, MessageRef::ZipWrong ; "too short")]
#[test_case(InputRef::ZipLong, MessageRef::ZipWrong ; "too long")]
#[tokio::test]
async fn invalid_zip_stays_on_step_1(input: InputRef, message: MessageRef) {
    let (form, pages) = open_form().await;
    let fixture = pages.fixture();
    let key = fixture.step_key(Step::ZipCode);

    pages.on_stepper_page().fill_zip_code(fixture.input(input)).await.unwrap();
    pages.on_common_page().click_next_button(key).await.unwrap();
    pages
        .on_common_page()
        .expect_step_transition_failure(key, fixture.message(message))
        .await
        .unwrap();

    assert_eq!(form.current_step(), Some(Step::ZipCode));
}

#[test_case(InputRef::NameEmpty, MessageRef::NameEmpty ; "empty")]
#[test_case(InputRef::NameShort, MessageRef::NameShort ; "too short")]
#[test_case(InputRef::NameInvalid, MessageRef::NameInvalid ; "bad characters")]
#[tokio::test]
async fn invalid_name_stays_on_step_4(input: InputRef, message: MessageRef) {
    let (form, pages) = open_form().await;
    pages.navigate_to_step4().await.unwrap();

    let fixture = pages.fixture();
    let key = fixture.step_key(Step::Contact);
    let stepper = pages.on_stepper_page();
    stepper.fill_name(fixture.input(input)).await.unwrap();
    stepper.fill_email(fixture.input(InputRef::Valid(FieldName::Email))).await.unwrap();
    pages.on_common_page().click_next_button(key).await.unwrap();
    pages
        .on_common_page()
        .expect_step_transition_failure(key, fixture.message(message))
        .await
        .unwrap();

    assert_eq!(form.current_step(), Some(Step::Contact));
}

#[tokio::test]
async fn success_assertion_fails_on_refused_step() {
    let (_form, pages) = open_form().await;
    let fixture = pages.fixture();
    let key = fixture.step_key(Step::ZipCode);

    pages.on_common_page().click_next_button(key).await.unwrap();
    let err = pages
        .on_common_page()
        .expect_step_transition_success(key)
        .await
        .unwrap_err();
    assert!(matches!(err, E2eError::AssertionFailed { .. }), "{err}");
}

#[tokio::test]
async fn progress_tracks_each_step() {
    let (_form, pages) = open_form().await;

    for step in Step::ALL {
        pages.on_common_page().expect_stepper_progress(step.order()).await.unwrap();
        if step != Step::Phone {
            pages.complete_step(step).await.unwrap();
        }
    }
}

#[test_case(Step::Interests ; "step 2")]
#[test_case(Step::PropertyType ; "step 3")]
#[test_case(Step::Contact ; "step 4")]
#[test_case(Step::Phone ; "step 5")]
#[tokio::test]
async fn navigate_to_matches_manual_walk(target: Step) {
    let (navigated, pages) = open_form().await;
    pages.navigate_to(target).await.unwrap();

    let (manual, manual_pages) = open_form().await;
    for step in target.predecessors() {
        manual_pages.complete_step(step).await.unwrap();
    }

    assert_eq!(navigated.current_step(), Some(target));
    assert_eq!(manual.current_step(), navigated.current_step());
    assert_eq!(manual.submissions(), navigated.submissions());
}

#[tokio::test]
async fn invalid_email_is_refused_without_message() {
    let (form, pages) = open_form().await;
    pages.navigate_to_step4().await.unwrap();

    let fixture = pages.fixture();
    let key = fixture.step_key(Step::Contact);
    let stepper = pages.on_stepper_page();
    stepper.fill_name(fixture.input(InputRef::Valid(FieldName::Name))).await.unwrap();
    stepper.fill_email(fixture.input(InputRef::EmailInvalid)).await.unwrap();

    for _ in 0..2 {
        pages.on_common_page().click_next_button(key).await.unwrap();
        pages.expect_title(Step::Contact).await.unwrap();
        assert_eq!(form.current_step(), Some(Step::Contact));
    }

    stepper.fill_email(fixture.input(InputRef::Valid(FieldName::Email))).await.unwrap();
    pages.on_common_page().click_next_button(key).await.unwrap();
    pages.expect_title(Step::Phone).await.unwrap();
}

#[tokio::test]
async fn phone_mask_keeps_ten_digits() {
    let (_form, pages) = open_form().await;
    pages.navigate_to_step5().await.unwrap();

    let stepper = pages.on_stepper_page();
    stepper.expect_phone_input_default_max_digits().await.unwrap();

    let err = stepper.expect_phone_input_max_digits(11).await.unwrap_err();
    assert!(matches!(err, E2eError::AssertionFailed { .. }));
}

#[tokio::test]
async fn checkbox_selection_is_confirmed() {
    let (_form, pages) = open_form().await;
    pages.navigate_to_step2().await.unwrap();

    let fixture = pages.fixture();
    pages
        .on_stepper_page()
        .select_checkbox(fixture.checkbox(CheckboxKey::Other))
        .await
        .unwrap();

    // Step 3 options are hidden while step 2 is on screen.
    let err = pages
        .on_stepper_page()
        .select_checkbox(fixture.checkbox(CheckboxKey::MobileHome))
        .await
        .unwrap_err();
    assert!(matches!(err, E2eError::ControlNotReady { .. }), "{err}");
}

#[tokio::test]
async fn full_flow_lands_on_thank_you() {
    let (form, pages) = open_form().await;
    pages.navigate_to_step5().await.unwrap();
    pages.complete_step(Step::Phone).await.unwrap();
    pages.expect_thank_you(THANK_YOU).await.unwrap();

    assert_eq!(form.current_step(), None);
    assert_eq!(form.current_url().await.unwrap(), THANK_YOU);
}

#[tokio::test]
async fn failing_scenario_retries_in_ci_and_reports() {
    let scenario = Scenario::from_yaml(
        r#"
name: phone-skipped
steps:
  - name: Submit step 5 without a phone
    actions:
      - action: navigate_to
        step: step_5
      - action: advance
        step: step_5
      - action: expect_thank_you
"#,
    )
    .unwrap();

    let suite = runner(true).run_all(std::slice::from_ref(&scenario)).await;
    assert_eq!(suite.failed, 1);
    assert_eq!(suite.results[0].attempts, 3);

    let dir = tempfile::tempdir().unwrap();
    let path = write_results(dir.path(), &suite).unwrap();
    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(report["failed"], 1);
    assert_eq!(report["results"][0]["attempts"], 3);
    assert_eq!(report["results"][0]["steps"][0]["success"], false);
}

#[tokio::test]
async fn scenarios_directory_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("smoke.yaml"),
        r#"
name: smoke
tags: [smoke]
steps:
  - name: Reach step 3
    actions:
      - action: navigate_to
        step: step_3
      - action: expect_progress
        step: step_3
"#,
    )
    .unwrap();

    let scenarios = Scenario::load_all(dir.path()).unwrap();
    let suite = runner(false).run_all(&scenarios).await;
    assert!(suite.success(), "{:?}", suite.results[0].error);
}
