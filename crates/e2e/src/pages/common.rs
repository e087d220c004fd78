//! Step-state inspector: titles, the next control, transitions and progress

use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::browser::Browser;
use crate::error::E2eResult;
use crate::expect::{self, Expect};
use crate::selectors;
use crate::step::Progress;

static EXIT_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(&regex::escape(selectors::EXIT_MARKER)).expect("escaped literal"));

pub struct CommonPage {
    browser: Arc<dyn Browser>,
    timeout: Duration,
}

impl CommonPage {
    pub fn new(browser: Arc<dyn Browser>, timeout: Duration) -> Self {
        Self { browser, timeout }
    }

    fn expect<'a>(&'a self, locator: &'a crate::browser::Locator) -> Expect<'a> {
        Expect::new(self.browser.as_ref(), locator, self.timeout)
    }

    // Actions

    /// Press the step's next control once it is visible and enabled.
    pub async fn click_next_button(&self, step_key: &str) -> E2eResult<()> {
        let button = selectors::next_button(step_key);
        debug!("Advancing from {}", step_key);

        expect::wait_visible(self.browser.as_ref(), &button, self.timeout).await?;
        expect::wait_enabled(self.browser.as_ref(), &button, self.timeout).await?;
        self.browser.click(&button).await
    }

    // Assertions

    pub async fn expect_step_transition_success(&self, step_key: &str) -> E2eResult<()> {
        let container = selectors::step_container(step_key);
        self.expect(&container)
            .to_match_attribute("class", &EXIT_MARKER)
            .await?;

        let error = selectors::error_message();
        self.expect(&error).to_have_count(0).await
    }

    pub async fn expect_step_transition_failure(&self, step_key: &str, message: &str) -> E2eResult<()> {
        let container = selectors::step_container(step_key);
        self.expect(&container)
            .not_to_match_attribute("class", &EXIT_MARKER)
            .await?;

        let error = selectors::error_message();
        self.expect(&error).to_contain_text(message).await
    }

    pub async fn expect_step_title(&self, step_key: &str, title: &str) -> E2eResult<()> {
        let heading = selectors::step_title(step_key);
        self.expect(&heading).to_be_visible().await?;
        self.expect(&heading).to_have_text(title).await
    }

    /// Check the three progress representations against the 1-based `step`.
    ///
    /// The total is read from the widget itself, so a form with a different
    /// number of steps still gets a consistent percentage.
    pub async fn expect_stepper_progress(&self, step: u32) -> E2eResult<()> {
        let total_locator = selectors::form().locator(selectors::PROGRESS_TOTAL_STEPS);
        let total_steps = self.expect(&total_locator).to_have_number().await?;

        let progress = Progress::expected(step, total_steps);
        debug!(
            "Expecting progress {}/{} ({}%)",
            progress.external, total_steps, progress.percent
        );

        let external = selectors::form().locator(selectors::PROGRESS_EXTERNAL_STEP);
        let internal = selectors::form().locator(selectors::PROGRESS_INTERNAL_STEP);
        let value = selectors::form().locator(selectors::PROGRESS_VALUE);

        self.expect(&external)
            .to_have_text(&progress.external.to_string())
            .await?;
        self.expect(&internal)
            .to_have_attribute(selectors::ATTR_CURRENT_STEP, &progress.internal.to_string())
            .await?;
        self.expect(&value)
            .to_have_attribute(selectors::ATTR_CURRENT_PROGRESS, &progress.percent.to_string())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::E2eError;
    use crate::fixture::Fixture;
    use crate::simulator::SimulatedForm;
    use crate::step::Step;

    const SHORT: Duration = Duration::from_millis(30);

    fn page() -> (Arc<SimulatedForm>, CommonPage) {
        let fixture = Arc::new(Fixture::builtin().unwrap());
        let form = Arc::new(SimulatedForm::new(fixture, "https://forms.example.com/thank-you"));
        let page = CommonPage::new(form.clone(), SHORT);
        (form, page)
    }

    #[tokio::test]
    async fn test_title_and_progress_on_first_step() {
        let (_, page) = page();
        page.expect_step_title("step-1", "What is your ZIP Code?").await.unwrap();
        page.expect_stepper_progress(1).await.unwrap();
        assert!(page.expect_stepper_progress(2).await.is_err());
    }

    #[tokio::test]
    async fn test_empty_zip_fails_transition() {
        let (_, page) = page();
        page.click_next_button("step-1").await.unwrap();
        page.expect_step_transition_failure("step-1", "Enter your ZIP code.")
            .await
            .unwrap();
        assert!(page.expect_step_transition_success("step-1").await.is_err());
    }

    #[tokio::test]
    async fn test_next_button_of_hidden_step_is_not_ready() {
        let (_, page) = page();
        let err = page.click_next_button("step-4").await.unwrap_err();
        assert!(matches!(err, E2eError::ControlNotReady { .. }));
    }

    #[tokio::test]
    async fn test_transition_failure_with_other_message_fails() {
        let (_, page) = page();
        page.click_next_button("step-1").await.unwrap();
        let err = page
            .expect_step_transition_failure("step-1", "Wrong ZIP code.")
            .await
            .unwrap_err();
        assert!(matches!(err, E2eError::AssertionFailed { .. }), "{err}");
    }

    #[tokio::test]
    async fn test_transition_failure_after_advancing_fails() {
        let (form, page) = page();
        form.fill(&selectors::zip_input(), "10001").await.unwrap();
        page.click_next_button("step-1").await.unwrap();

        let err = page
            .expect_step_transition_failure("step-1", "Enter your ZIP code.")
            .await
            .unwrap_err();
        match err {
            E2eError::AssertionFailed { actual, .. } => assert!(actual.contains("moveLeftOut")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_disabled_next_button_is_not_ready() {
        let (form, page) = page();
        form.disable_next(Step::ZipCode);
        let err = page.click_next_button("step-1").await.unwrap_err();
        match err {
            E2eError::ControlNotReady { reason, .. } => assert!(reason.contains("disabled")),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(form.submissions(), 0);
    }

    #[tokio::test]
    async fn test_progress_waits_for_total_to_render() {
        let fixture = Arc::new(Fixture::builtin().unwrap());
        let form = Arc::new(SimulatedForm::new(fixture, "https://forms.example.com/thank-you"));
        let page = CommonPage::new(form.clone(), Duration::from_millis(500));

        form.delay_progress_total(2);
        page.expect_stepper_progress(1).await.unwrap();
    }

    #[tokio::test]
    async fn test_progress_without_total_fails_after_timeout() {
        let (form, page) = page();
        form.delay_progress_total(usize::MAX);
        let err = page.expect_stepper_progress(1).await.unwrap_err();
        match err {
            E2eError::AssertionFailed { expected, actual, .. } => {
                assert_eq!(expected, "a whole number");
                assert_eq!(actual, "<no element>");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
