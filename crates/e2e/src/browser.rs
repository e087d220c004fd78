//! Browser capability interface
//!
//! Pages never talk to an engine directly. They describe elements with a
//! [`Locator`] and drive them through the [`Browser`] trait, which is
//! implemented by the Playwright bridge and by the in-memory simulator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::E2eResult;

/// One hop of a locator chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum Selector {
    /// CSS selector
    Css { css: String },
    /// Form control associated with a label
    Label { text: String },
    /// Elements matching `css` whose text contains `has_text`
    Filter { css: String, has_text: String },
    /// Heading with the given accessible name
    Heading { name: String },
}

/// Description of an element, resolved lazily by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    pub chain: Vec<Selector>,
    #[serde(default)]
    pub first: bool,
}

impl Locator {
    pub fn css(css: impl Into<String>) -> Self {
        Self {
            chain: vec![Selector::Css { css: css.into() }],
            first: false,
        }
    }

    pub fn heading(name: impl Into<String>) -> Self {
        Self {
            chain: vec![Selector::Heading { name: name.into() }],
            first: false,
        }
    }

    fn then(&self, selector: Selector) -> Self {
        let mut chain = self.chain.clone();
        chain.push(selector);
        Self { chain, first: false }
    }

    /// Descendants matching a CSS selector
    pub fn locator(&self, css: impl Into<String>) -> Self {
        self.then(Selector::Css { css: css.into() })
    }

    /// Control labelled `text`
    pub fn get_by_label(&self, text: impl Into<String>) -> Self {
        self.then(Selector::Label { text: text.into() })
    }

    /// Descendants matching `css` that contain `text`
    pub fn filter_has_text(&self, css: impl Into<String>, text: impl Into<String>) -> Self {
        self.then(Selector::Filter {
            css: css.into(),
            has_text: text.into(),
        })
    }

    pub fn first(mut self) -> Self {
        self.first = true;
        self
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, selector) in self.chain.iter().enumerate() {
            if i > 0 {
                f.write_str(" >> ")?;
            }
            match selector {
                Selector::Css { css } => f.write_str(css)?,
                Selector::Label { text } => write!(f, "label={:?}", text)?,
                Selector::Filter { css, has_text } => write!(f, "{} has-text={:?}", css, has_text)?,
                Selector::Heading { name } => write!(f, "heading={:?}", name)?,
            }
        }
        if self.first {
            f.write_str(" >> nth=0")?;
        }
        Ok(())
    }
}

/// What the suite needs from a browser session.
///
/// Probes (`count`, `is_*`, reads) answer for the current DOM without
/// waiting. Actions (`click`, `fill`) may wait for actionability within the
/// engine's own timeout.
#[async_trait]
pub trait Browser: Send + Sync {
    async fn goto(&self, url: &str) -> E2eResult<()>;

    async fn current_url(&self) -> E2eResult<String>;

    async fn count(&self, locator: &Locator) -> E2eResult<usize>;

    async fn is_visible(&self, locator: &Locator) -> E2eResult<bool>;

    async fn is_enabled(&self, locator: &Locator) -> E2eResult<bool>;

    async fn is_checked(&self, locator: &Locator) -> E2eResult<bool>;

    async fn click(&self, locator: &Locator) -> E2eResult<()>;

    async fn fill(&self, locator: &Locator, value: &str) -> E2eResult<()>;

    async fn text_content(&self, locator: &Locator) -> E2eResult<Option<String>>;

    async fn attribute(&self, locator: &Locator, name: &str) -> E2eResult<Option<String>>;

    async fn input_value(&self, locator: &Locator) -> E2eResult<String>;

    /// Keep diagnostics (screenshot, trace, video) for a failed attempt.
    async fn capture_failure(&self, name: &str) -> E2eResult<Vec<PathBuf>>;

    async fn close(&self) -> E2eResult<()>;
}

/// Opens a fresh, isolated session for each scenario attempt.
#[async_trait]
pub trait Launcher: Send + Sync {
    async fn launch(&self, label: &str) -> E2eResult<Arc<dyn Browser>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_and_display() {
        let form = Locator::css("#form-container-1");
        let email = form.locator("input[name=\"email\"]").first();
        assert_eq!(email.chain.len(), 2);
        assert!(email.first);
        assert!(!form.first);
        assert_eq!(
            email.to_string(),
            "#form-container-1 >> input[name=\"email\"] >> nth=0"
        );

        let label = form.filter_has_text("label", "Safety");
        assert_eq!(label.to_string(), "#form-container-1 >> label has-text=\"Safety\"");
    }

    #[test]
    fn test_wire_shape() {
        let locator = Locator::css("#form").get_by_label("Other");
        let json = serde_json::to_value(&locator).unwrap();
        assert_eq!(json["chain"][0]["by"], "css");
        assert_eq!(json["chain"][1]["by"], "label");
        assert_eq!(json["chain"][1]["text"], "Other");
        assert_eq!(json["first"], false);
    }
}
