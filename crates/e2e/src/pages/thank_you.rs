//! Confirmation page reached after the last step

use std::sync::Arc;
use std::time::Duration;

use crate::browser::{Browser, Locator};
use crate::error::E2eResult;
use crate::expect::{self, Expect};

pub struct ThankYouPage {
    browser: Arc<dyn Browser>,
    timeout: Duration,
}

impl ThankYouPage {
    pub fn new(browser: Arc<dyn Browser>, timeout: Duration) -> Self {
        Self { browser, timeout }
    }

    pub async fn expect_loaded(&self, url: &str, heading: &str) -> E2eResult<()> {
        expect::expect_url(self.browser.as_ref(), url, self.timeout).await?;

        let heading = Locator::heading(heading);
        Expect::new(self.browser.as_ref(), &heading, self.timeout)
            .to_be_visible()
            .await
    }
}
