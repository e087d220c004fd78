//! Field-input driver

use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::browser::{Browser, Locator};
use crate::error::{E2eError, E2eResult};
use crate::expect::{self, Expect};
use crate::selectors;
use crate::step::{PHONE_MAX_DIGITS, PHONE_PROBE_DIGITS};

static NON_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\D").expect("static pattern"));

pub struct StepperPage {
    browser: Arc<dyn Browser>,
    timeout: Duration,
}

impl StepperPage {
    pub fn new(browser: Arc<dyn Browser>, timeout: Duration) -> Self {
        Self { browser, timeout }
    }

    async fn click_and_fill(&self, input: &Locator, value: &str) -> E2eResult<()> {
        debug!("Filling {} with {:?}", input, value);
        self.browser.click(input).await?;
        self.browser.fill(input, value).await
    }

    // Actions

    pub async fn fill_zip_code(&self, zip_code: &str) -> E2eResult<()> {
        self.click_and_fill(&selectors::zip_input(), zip_code).await
    }

    pub async fn fill_name(&self, name: &str) -> E2eResult<()> {
        self.click_and_fill(&selectors::name_input(), name).await
    }

    pub async fn fill_email(&self, email: &str) -> E2eResult<()> {
        self.click_and_fill(&selectors::email_input(), email).await
    }

    pub async fn fill_phone_number(&self, phone_number: &str) -> E2eResult<()> {
        self.click_and_fill(&selectors::phone_input(), phone_number).await
    }

    /// Click a checkbox through its visible label and confirm it took.
    pub async fn select_checkbox(&self, label: &str) -> E2eResult<()> {
        let label_locator = selectors::checkbox_label(label);
        let input = selectors::checkbox_input(label);

        expect::wait_visible(self.browser.as_ref(), &label_locator, self.timeout).await?;
        self.browser.click(&label_locator).await?;
        Expect::new(self.browser.as_ref(), &input, self.timeout)
            .to_be_checked()
            .await
    }

    // Assertions

    /// Overfill the phone input and count the digits the mask keeps.
    pub async fn expect_phone_input_max_digits(&self, max_digits: usize) -> E2eResult<()> {
        let input = selectors::phone_input();
        let typed = max_digits
            .saturating_mul(2)
            .clamp(PHONE_PROBE_DIGITS, 2 * PHONE_PROBE_DIGITS);
        let long_text = "2".repeat(typed);

        self.click_and_fill(&input, &long_text).await?;

        let actual = self.browser.input_value(&input).await?;
        let digits = NON_DIGIT.replace_all(&actual, "");
        if digits.len() != max_digits {
            return Err(E2eError::assertion(
                format!("{} digit count after typing {} digits", input, long_text.len()),
                max_digits.to_string(),
                format!("{} ({:?})", digits.len(), actual),
            ));
        }
        Ok(())
    }

    pub async fn expect_phone_input_default_max_digits(&self) -> E2eResult<()> {
        self.expect_phone_input_max_digits(PHONE_MAX_DIGITS).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::Fixture;
    use crate::simulator::SimulatedForm;
    use crate::step::Step;

    const SHORT: Duration = Duration::from_millis(30);

    async fn on_step(step: Step) -> (Arc<SimulatedForm>, StepperPage) {
        let fixture = Arc::new(Fixture::builtin().unwrap());
        let form = Arc::new(SimulatedForm::new(fixture.clone(), "https://forms.example.com/thank-you"));
        let pages = crate::pages::PageManager::new(form.clone(), fixture, SHORT);
        pages.navigate_to(step).await.unwrap();
        (form.clone(), StepperPage::new(form, SHORT))
    }

    #[tokio::test]
    async fn test_select_checkbox_confirms_checked() {
        let (_, page) = on_step(Step::Interests).await;
        page.select_checkbox("Safety").await.unwrap();
    }

    #[tokio::test]
    async fn test_checkbox_that_never_checks_fails() {
        let (form, page) = on_step(Step::Interests).await;
        form.stick_checkbox("Other");

        let err = page.select_checkbox("Other").await.unwrap_err();
        match err {
            E2eError::AssertionFailed { expected, actual, .. } => {
                assert_eq!(expected, "checked");
                assert_eq!(actual, "unchecked");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_phone_mask_digit_count() {
        let (_, page) = on_step(Step::Phone).await;
        page.expect_phone_input_default_max_digits().await.unwrap();
        assert!(page.expect_phone_input_max_digits(PHONE_PROBE_DIGITS).await.is_err());
    }

    #[tokio::test]
    async fn test_huge_max_digits_fails_without_panicking() {
        let (_, page) = on_step(Step::Phone).await;
        let err = page.expect_phone_input_max_digits(usize::MAX).await.unwrap_err();
        assert!(matches!(err, E2eError::AssertionFailed { .. }));
    }
}
