//! Flow orchestrator
//!
//! Composes the page objects into the valid-input walk through the form,
//! used as setup by scenarios that start deeper than step 1. Every walk
//! assumes a freshly loaded form.

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::browser::Browser;
use crate::error::E2eResult;
use crate::fixture::{CheckboxKey, Fixture, InputRef};
use crate::pages::{CommonPage, StepperPage, ThankYouPage};
use crate::step::{FieldName, Step};

pub struct PageManager {
    fixture: Arc<Fixture>,
    common_page: CommonPage,
    stepper_page: StepperPage,
    thank_you_page: ThankYouPage,
}

impl PageManager {
    pub fn new(browser: Arc<dyn Browser>, fixture: Arc<Fixture>, timeout: Duration) -> Self {
        Self {
            fixture,
            common_page: CommonPage::new(browser.clone(), timeout),
            stepper_page: StepperPage::new(browser.clone(), timeout),
            thank_you_page: ThankYouPage::new(browser, timeout),
        }
    }

    pub fn on_common_page(&self) -> &CommonPage {
        &self.common_page
    }

    pub fn on_stepper_page(&self) -> &StepperPage {
        &self.stepper_page
    }

    pub fn on_thank_you_page(&self) -> &ThankYouPage {
        &self.thank_you_page
    }

    pub fn fixture(&self) -> &Fixture {
        &self.fixture
    }

    pub async fn expect_title(&self, step: Step) -> E2eResult<()> {
        self.common_page
            .expect_step_title(self.fixture.step_key(step), self.fixture.title(step))
            .await
    }

    /// Fill `step` with valid fixture data and submit it.
    ///
    /// Steps 1-4 must visibly transition out. Submitting step 5 navigates
    /// away, so it is left to the caller to check the confirmation page.
    pub async fn complete_step(&self, step: Step) -> E2eResult<()> {
        let fixture = &self.fixture;
        let key = fixture.step_key(step);

        self.expect_title(step).await?;

        match step {
            Step::ZipCode => {
                self.stepper_page
                    .fill_zip_code(fixture.input(InputRef::Valid(FieldName::Zip)))
                    .await?;
            }
            Step::Interests => {
                self.stepper_page.select_checkbox(fixture.checkbox(CheckboxKey::Other)).await?;
                self.stepper_page.select_checkbox(fixture.checkbox(CheckboxKey::Safety)).await?;
            }
            Step::PropertyType => {
                self.stepper_page
                    .select_checkbox(fixture.checkbox(CheckboxKey::RentalProperty))
                    .await?;
                self.stepper_page
                    .select_checkbox(fixture.checkbox(CheckboxKey::MobileHome))
                    .await?;
            }
            Step::Contact => {
                self.stepper_page
                    .fill_name(fixture.input(InputRef::Valid(FieldName::Name)))
                    .await?;
                self.stepper_page
                    .fill_email(fixture.input(InputRef::Valid(FieldName::Email)))
                    .await?;
            }
            Step::Phone => {
                self.stepper_page
                    .fill_phone_number(fixture.input(InputRef::Valid(FieldName::Phone)))
                    .await?;
            }
        }

        self.common_page.click_next_button(key).await?;

        if step != Step::Phone {
            self.common_page.expect_step_transition_success(key).await?;
        }
        Ok(())
    }

    /// Walk from step 1 to `target` with valid inputs and confirm arrival.
    pub async fn navigate_to(&self, target: Step) -> E2eResult<()> {
        info!("Navigating to {}", target);
        for step in target.predecessors() {
            self.complete_step(step).await?;
        }
        self.expect_title(target).await
    }

    pub async fn navigate_to_step2(&self) -> E2eResult<()> {
        self.navigate_to(Step::Interests).await
    }

    pub async fn navigate_to_step3(&self) -> E2eResult<()> {
        self.navigate_to(Step::PropertyType).await
    }

    pub async fn navigate_to_step4(&self) -> E2eResult<()> {
        self.navigate_to(Step::Contact).await
    }

    pub async fn navigate_to_step5(&self) -> E2eResult<()> {
        self.navigate_to(Step::Phone).await
    }

    /// Final URL and confirmation heading after the whole form was sent.
    pub async fn expect_thank_you(&self, thank_you_url: &str) -> E2eResult<()> {
        self.thank_you_page
            .expect_loaded(thank_you_url, &self.fixture.thank_you.heading)
            .await
    }
}
