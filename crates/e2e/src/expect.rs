//! Auto-retrying assertions
//!
//! Every assertion re-probes the browser until it holds or the action
//! timeout runs out, so pages can assert on state the form reaches
//! asynchronously (CSS transitions, validation rendering, redirects).

use regex::Regex;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

use crate::browser::{Browser, Locator};
use crate::error::{E2eError, E2eResult};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

enum Check<T> {
    Pass(T),
    Fail(String),
}

async fn poll<T, F, Fut>(timeout: Duration, context: String, expected: String, mut probe: F) -> E2eResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = E2eResult<Check<T>>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        let actual = match probe().await? {
            Check::Pass(value) => return Ok(value),
            Check::Fail(actual) => actual,
        };

        let now = Instant::now();
        if now >= deadline {
            return Err(E2eError::AssertionFailed {
                context,
                expected,
                actual,
            });
        }
        sleep(POLL_INTERVAL.min(deadline - now)).await;
    }
}

/// Collapse runs of whitespace and trim, as rendered text comparisons do.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Assertions about one element.
pub struct Expect<'a> {
    browser: &'a dyn Browser,
    locator: &'a Locator,
    timeout: Duration,
}

impl<'a> Expect<'a> {
    pub fn new(browser: &'a dyn Browser, locator: &'a Locator, timeout: Duration) -> Self {
        Self {
            browser,
            locator,
            timeout,
        }
    }

    fn context(&self, what: &str) -> String {
        format!("{} {}", self.locator, what)
    }

    pub async fn to_be_visible(&self) -> E2eResult<()> {
        let (browser, locator) = (self.browser, self.locator);
        poll(self.timeout, self.context("visibility"), "visible".into(), move || async move {
            Ok(if browser.is_visible(locator).await? {
                Check::Pass(())
            } else {
                Check::Fail("hidden".into())
            })
        })
        .await
    }

    pub async fn to_be_enabled(&self) -> E2eResult<()> {
        let (browser, locator) = (self.browser, self.locator);
        poll(self.timeout, self.context("enabled state"), "enabled".into(), move || async move {
            Ok(if browser.is_enabled(locator).await? {
                Check::Pass(())
            } else {
                Check::Fail("disabled".into())
            })
        })
        .await
    }

    pub async fn to_be_checked(&self) -> E2eResult<()> {
        let (browser, locator) = (self.browser, self.locator);
        poll(self.timeout, self.context("checked state"), "checked".into(), move || async move {
            Ok(if browser.is_checked(locator).await? {
                Check::Pass(())
            } else {
                Check::Fail("unchecked".into())
            })
        })
        .await
    }

    pub async fn to_have_count(&self, expected: usize) -> E2eResult<()> {
        let (browser, locator) = (self.browser, self.locator);
        poll(self.timeout, self.context("count"), expected.to_string(), move || async move {
            let count = browser.count(locator).await?;
            Ok(if count == expected {
                Check::Pass(())
            } else {
                Check::Fail(count.to_string())
            })
        })
        .await
    }

    /// Whole text equals `expected`, ignoring whitespace layout.
    pub async fn to_have_text(&self, expected: &str) -> E2eResult<()> {
        let (browser, locator) = (self.browser, self.locator);
        let want = normalize_whitespace(expected);
        let want_ref = want.as_str();
        poll(self.timeout, self.context("text"), want.clone(), move || async move {
            Ok(match browser.text_content(locator).await? {
                Some(text) if normalize_whitespace(&text) == want_ref => Check::Pass(()),
                Some(text) => Check::Fail(text),
                None => Check::Fail("<no element>".into()),
            })
        })
        .await
    }

    pub async fn to_contain_text(&self, expected: &str) -> E2eResult<()> {
        let (browser, locator) = (self.browser, self.locator);
        let want = normalize_whitespace(expected);
        let want_ref = want.as_str();
        poll(self.timeout, self.context("text"), format!("contains '{}'", want), move || async move {
            Ok(match browser.text_content(locator).await? {
                Some(text) if normalize_whitespace(&text).contains(want_ref) => Check::Pass(()),
                Some(text) => Check::Fail(text),
                None => Check::Fail("<no element>".into()),
            })
        })
        .await
    }

    pub async fn to_have_attribute(&self, name: &str, expected: &str) -> E2eResult<()> {
        let (browser, locator) = (self.browser, self.locator);
        poll(
            self.timeout,
            self.context(&format!("attribute {}", name)),
            expected.to_string(),
            move || async move {
                Ok(match browser.attribute(locator, name).await? {
                    Some(value) if value == expected => Check::Pass(()),
                    Some(value) => Check::Fail(value),
                    None => Check::Fail("<absent>".into()),
                })
            },
        )
        .await
    }

    pub async fn to_match_attribute(&self, name: &str, pattern: &Regex) -> E2eResult<()> {
        let (browser, locator) = (self.browser, self.locator);
        poll(
            self.timeout,
            self.context(&format!("attribute {}", name)),
            format!("matches /{}/", pattern),
            move || async move {
                Ok(match browser.attribute(locator, name).await? {
                    Some(value) if pattern.is_match(&value) => Check::Pass(()),
                    Some(value) => Check::Fail(value),
                    None => Check::Fail("<absent>".into()),
                })
            },
        )
        .await
    }

    /// Text of the element once it reads as a whole number.
    pub async fn to_have_number(&self) -> E2eResult<u32> {
        let (browser, locator) = (self.browser, self.locator);
        poll(self.timeout, self.context("text"), "a whole number".into(), move || async move {
            Ok(match browser.text_content(locator).await? {
                Some(text) => match text.trim().parse::<u32>() {
                    Ok(number) => Check::Pass(number),
                    Err(_) => Check::Fail(text),
                },
                None => Check::Fail("<no element>".into()),
            })
        })
        .await
    }

    /// Passes when the attribute is absent or does not match.
    pub async fn not_to_match_attribute(&self, name: &str, pattern: &Regex) -> E2eResult<()> {
        let (browser, locator) = (self.browser, self.locator);
        poll(
            self.timeout,
            self.context(&format!("attribute {}", name)),
            format!("does not match /{}/", pattern),
            move || async move {
                Ok(match browser.attribute(locator, name).await? {
                    Some(value) if pattern.is_match(&value) => Check::Fail(value),
                    _ => Check::Pass(()),
                })
            },
        )
        .await
    }
}

/// Wait until an interactive element is visible.
///
/// Expiry means the control was never ready, not that an observed value
/// was wrong.
pub async fn wait_visible(browser: &dyn Browser, locator: &Locator, timeout: Duration) -> E2eResult<()> {
    Expect::new(browser, locator, timeout)
        .to_be_visible()
        .await
        .map_err(|e| not_ready(locator, e))
}

/// Wait until an interactive element is enabled.
pub async fn wait_enabled(browser: &dyn Browser, locator: &Locator, timeout: Duration) -> E2eResult<()> {
    Expect::new(browser, locator, timeout)
        .to_be_enabled()
        .await
        .map_err(|e| not_ready(locator, e))
}

fn not_ready(locator: &Locator, err: E2eError) -> E2eError {
    match err {
        E2eError::AssertionFailed { actual, .. } => E2eError::ControlNotReady {
            control: locator.to_string(),
            reason: format!("still {}", actual),
        },
        other => other,
    }
}

/// The page ends up at exactly `expected`.
pub async fn expect_url(browser: &dyn Browser, expected: &str, timeout: Duration) -> E2eResult<()> {
    poll(timeout, "page URL".into(), expected.to_string(), move || async move {
        let url = browser.current_url().await?;
        Ok(if url == expected {
            Check::Pass(())
        } else {
            Check::Fail(url)
        })
    })
    .await
}
