//! In-memory model of the hosted stepper form
//!
//! Implements [`Browser`] over the same DOM contract the live form exposes:
//! per-step containers that gain the exit marker, a single error node,
//! checkbox labels, the progress widget's data attributes, a masked phone
//! input and the redirect to the confirmation page. Validation texts come
//! from the fixture, so a simulated run exercises every page object and
//! scenario without a browser.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::browser::{Browser, Launcher, Locator, Selector};
use crate::error::{E2eError, E2eResult};
use crate::fixture::{CheckboxKey, Fixture, MessageRef};
use crate::selectors;
use crate::step::{FieldName, Progress, Step, TransitionOutcome, PHONE_MAX_DIGITS};

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[A-Za-z]{2,}$").expect("static pattern"));

/// Options the form offers besides the ones scenarios pick.
const EXTRA_INTERESTS: &[&str] = &["Windows", "Roofing"];
const EXTRA_PROPERTY_TYPES: &[&str] = &["Owned House / Condo", "Commercial Property"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Form(Step),
    ThankYou,
}

#[derive(Debug)]
struct FormState {
    url: String,
    view: View,
    exited: BTreeSet<Step>,
    values: HashMap<FieldName, String>,
    checked: HashSet<String>,
    error: Option<String>,
    submissions: usize,
}

impl FormState {
    fn fresh(url: String) -> Self {
        Self {
            url,
            view: View::Form(Step::ZipCode),
            exited: BTreeSet::new(),
            values: HashMap::new(),
            checked: HashSet::new(),
            error: None,
            submissions: 0,
        }
    }

    fn current(&self) -> Option<Step> {
        match self.view {
            View::Form(step) => Some(step),
            View::ThankYou => None,
        }
    }
}

/// Misbehaviour switched on by tests; survives `goto`.
#[derive(Debug, Default)]
struct Faults {
    disabled_next: HashSet<Step>,
    stuck_checkboxes: HashSet<String>,
    unrendered_total_reads: usize,
}

/// Element a locator resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    NextButton(Step),
    Container(Step),
    Title(Step),
    Error,
    Input(FieldName),
    CheckboxInput(String),
    CheckboxLabel(String),
    ProgressExternal,
    ProgressInternal,
    ProgressValue,
    ProgressTotal,
    Heading(String),
    Missing,
}

pub struct SimulatedForm {
    fixture: Arc<Fixture>,
    thank_you_url: String,
    state: Mutex<FormState>,
    faults: Mutex<Faults>,
}

impl SimulatedForm {
    pub fn new(fixture: Arc<Fixture>, thank_you_url: impl Into<String>) -> Self {
        Self {
            fixture,
            thank_you_url: thank_you_url.into(),
            state: Mutex::new(FormState::fresh("about:blank".to_string())),
            faults: Mutex::new(Faults::default()),
        }
    }

    /// Keep the next control of `step` rendered but disabled.
    pub fn disable_next(&self, step: Step) {
        self.faults.lock().disabled_next.insert(step);
    }

    /// Clicks on this checkbox leave it unchecked.
    pub fn stick_checkbox(&self, label: &str) {
        self.faults.lock().stuck_checkboxes.insert(label.to_string());
    }

    /// The progress total renders empty for the next `reads` text reads.
    pub fn delay_progress_total(&self, reads: usize) {
        self.faults.lock().unrendered_total_reads = reads;
    }

    /// Step currently on screen; `None` once redirected.
    pub fn current_step(&self) -> Option<Step> {
        self.state.lock().current()
    }

    /// Number of times any next control was pressed.
    pub fn submissions(&self) -> usize {
        self.state.lock().submissions
    }

    fn checkbox_step(&self, label: &str) -> Option<Step> {
        if let Some(key) = self.fixture.checkbox_for_label(label) {
            return Some(key.step());
        }
        if EXTRA_INTERESTS.contains(&label) {
            Some(Step::Interests)
        } else if EXTRA_PROPERTY_TYPES.contains(&label) {
            Some(Step::PropertyType)
        } else {
            None
        }
    }

    fn resolve(&self, locator: &Locator) -> Node {
        let mut chain = locator.chain.as_slice();
        if let [Selector::Css { css }, rest @ ..] = chain {
            if css == selectors::FORM_CONTAINER {
                chain = rest;
            }
        }

        match chain {
            [Selector::Heading { name }] => Node::Heading(name.clone()),
            [Selector::Label { text }] => match self.checkbox_step(text) {
                Some(_) => Node::CheckboxInput(text.clone()),
                None => Node::Missing,
            },
            [Selector::Filter { css, has_text }] if css == selectors::LABEL => {
                match self.checkbox_step(has_text) {
                    Some(_) => Node::CheckboxLabel(has_text.clone()),
                    None => Node::Missing,
                }
            }
            [Selector::Css { css: outer }, Selector::Css { css: inner }]
                if inner == selectors::STEP_TITLE =>
            {
                selectors::parse_step_container(outer)
                    .and_then(|key| self.fixture.step_for_key(key))
                    .map(Node::Title)
                    .unwrap_or(Node::Missing)
            }
            [Selector::Css { css }] => self.resolve_css(css),
            _ => Node::Missing,
        }
    }

    fn resolve_css(&self, css: &str) -> Node {
        if let Some(key) = selectors::parse_next_button(css) {
            return self.fixture.step_for_key(key).map(Node::NextButton).unwrap_or(Node::Missing);
        }
        if let Some(key) = selectors::parse_step_container(css) {
            return self.fixture.step_for_key(key).map(Node::Container).unwrap_or(Node::Missing);
        }
        match css {
            selectors::ERROR_MESSAGE => Node::Error,
            selectors::ZIP_INPUT => Node::Input(FieldName::Zip),
            selectors::NAME_INPUT => Node::Input(FieldName::Name),
            selectors::EMAIL_INPUT => Node::Input(FieldName::Email),
            selectors::PHONE_INPUT => Node::Input(FieldName::Phone),
            selectors::PROGRESS_EXTERNAL_STEP => Node::ProgressExternal,
            selectors::PROGRESS_INTERNAL_STEP => Node::ProgressInternal,
            selectors::PROGRESS_VALUE => Node::ProgressValue,
            selectors::PROGRESS_TOTAL_STEPS => Node::ProgressTotal,
            _ => Node::Missing,
        }
    }

    fn exists(&self, state: &FormState, node: &Node) -> bool {
        match node {
            Node::Missing => false,
            Node::Error => state.error.is_some() && state.current().is_some(),
            Node::Heading(name) => {
                state.view == View::ThankYou && *name == self.fixture.thank_you.heading
            }
            _ => state.current().is_some(),
        }
    }

    fn visible(&self, state: &FormState, node: &Node) -> bool {
        if !self.exists(state, node) {
            return false;
        }
        let current = state.current();
        match node {
            Node::NextButton(step) | Node::Container(step) | Node::Title(step) => {
                current == Some(*step)
            }
            Node::Input(field) => Step::of_field(*field) == current,
            Node::CheckboxInput(label) | Node::CheckboxLabel(label) => {
                self.checkbox_step(label) == current
            }
            _ => true,
        }
    }

    fn require_visible(&self, state: &FormState, locator: &Locator, node: &Node) -> E2eResult<()> {
        if self.visible(state, node) {
            Ok(())
        } else {
            Err(E2eError::Timeout(format!("{} to be visible", locator)))
        }
    }

    fn evaluate(&self, state: &FormState, step: Step) -> TransitionOutcome {
        let fixture = &self.fixture;
        let fail = |message: MessageRef| TransitionOutcome::Failure {
            message: Some(fixture.message(message).to_string()),
        };
        let value = |field: FieldName| {
            state
                .values
                .get(&field)
                .map(|v| v.trim().to_string())
                .unwrap_or_default()
        };

        match step {
            Step::ZipCode => {
                let zip = value(FieldName::Zip);
                if zip.is_empty() {
                    fail(MessageRef::ZipEmpty)
                } else if zip.len() != 5 || !zip.chars().all(|c| c.is_ascii_digit()) {
                    fail(MessageRef::ZipWrong)
                } else {
                    TransitionOutcome::Success
                }
            }
            Step::Interests | Step::PropertyType => {
                let any = state
                    .checked
                    .iter()
                    .any(|label| self.checkbox_step(label) == Some(step));
                if any {
                    TransitionOutcome::Success
                } else {
                    fail(MessageRef::ChooseOne)
                }
            }
            Step::Contact => {
                let name = value(FieldName::Name);
                let allowed = |c: char| c.is_alphabetic() || c == ' ' || c == '-' || c == '\'';
                if name.is_empty() {
                    fail(MessageRef::NameEmpty)
                } else if !name.chars().all(allowed) {
                    fail(MessageRef::NameInvalid)
                } else if name.chars().count() < 2 {
                    fail(MessageRef::NameShort)
                } else if !EMAIL.is_match(&value(FieldName::Email)) {
                    // The form refuses silently on a bad email.
                    TransitionOutcome::Failure { message: None }
                } else {
                    TransitionOutcome::Success
                }
            }
            Step::Phone => {
                let digits = value(FieldName::Phone)
                    .chars()
                    .filter(|c| c.is_ascii_digit())
                    .count();
                if digits == 0 {
                    fail(MessageRef::PhoneEmpty)
                } else if digits < PHONE_MAX_DIGITS {
                    fail(MessageRef::PhoneWrong)
                } else {
                    TransitionOutcome::Success
                }
            }
        }
    }

    fn submit(&self, state: &mut FormState, step: Step) {
        state.submissions += 1;
        let outcome = self.evaluate(state, step);
        debug!("Simulated submit of {}: {:?}", step, outcome);

        match outcome {
            TransitionOutcome::Success => {
                state.exited.insert(step);
                state.error = None;
                match step.next() {
                    Some(next) => state.view = View::Form(next),
                    None => {
                        state.view = View::ThankYou;
                        state.url = self.thank_you_url.clone();
                    }
                }
            }
            TransitionOutcome::Failure { message } => state.error = message,
        }
    }
}

/// Keep at most ten digits and render them the way the form's mask does.
fn mask_phone(raw: &str) -> String {
    let digits: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit())
        .take(PHONE_MAX_DIGITS)
        .collect();
    match digits.len() {
        0 => String::new(),
        1..=3 => format!("({}", digits),
        4..=6 => format!("({}) {}", &digits[..3], &digits[3..]),
        _ => format!("({}) {}-{}", &digits[..3], &digits[3..6], &digits[6..]),
    }
}

#[async_trait]
impl Browser for SimulatedForm {
    async fn goto(&self, url: &str) -> E2eResult<()> {
        let mut state = self.state.lock();
        *state = FormState::fresh(url.to_string());
        if url == self.thank_you_url {
            state.view = View::ThankYou;
        }
        Ok(())
    }

    async fn current_url(&self) -> E2eResult<String> {
        Ok(self.state.lock().url.clone())
    }

    async fn count(&self, locator: &Locator) -> E2eResult<usize> {
        let node = self.resolve(locator);
        let state = self.state.lock();
        Ok(usize::from(self.exists(&state, &node)))
    }

    async fn is_visible(&self, locator: &Locator) -> E2eResult<bool> {
        let node = self.resolve(locator);
        let state = self.state.lock();
        Ok(self.visible(&state, &node))
    }

    async fn is_enabled(&self, locator: &Locator) -> E2eResult<bool> {
        let node = self.resolve(locator);
        if let Node::NextButton(step) = &node {
            if self.faults.lock().disabled_next.contains(step) {
                return Ok(false);
            }
        }
        let state = self.state.lock();
        Ok(self.exists(&state, &node))
    }

    async fn is_checked(&self, locator: &Locator) -> E2eResult<bool> {
        match self.resolve(locator) {
            Node::CheckboxInput(label) => Ok(self.state.lock().checked.contains(&label)),
            _ => Err(E2eError::Playwright(format!("{} is not a checkbox", locator))),
        }
    }

    async fn click(&self, locator: &Locator) -> E2eResult<()> {
        let node = self.resolve(locator);
        let faults = self.faults.lock();
        let mut state = self.state.lock();
        self.require_visible(&state, locator, &node)?;

        match node {
            Node::NextButton(step) if faults.disabled_next.contains(&step) => {
                return Err(E2eError::Timeout(format!("{} to be enabled", locator)));
            }
            Node::NextButton(step) => self.submit(&mut state, step),
            Node::CheckboxInput(label) | Node::CheckboxLabel(label)
                if faults.stuck_checkboxes.contains(&label) => {}
            Node::CheckboxInput(label) | Node::CheckboxLabel(label) => {
                if !state.checked.remove(&label) {
                    state.checked.insert(label);
                }
            }
            _ => {}
        }
        Ok(())
    }

    async fn fill(&self, locator: &Locator, value: &str) -> E2eResult<()> {
        let node = self.resolve(locator);
        let mut state = self.state.lock();
        self.require_visible(&state, locator, &node)?;

        match node {
            Node::Input(field) => {
                let value = if field == FieldName::Phone {
                    mask_phone(value)
                } else {
                    value.to_string()
                };
                state.values.insert(field, value);
                Ok(())
            }
            _ => Err(E2eError::Playwright(format!(
                "{} is not an <input> element",
                locator
            ))),
        }
    }

    async fn text_content(&self, locator: &Locator) -> E2eResult<Option<String>> {
        let node = self.resolve(locator);
        if node == Node::ProgressTotal {
            let mut faults = self.faults.lock();
            if faults.unrendered_total_reads > 0 {
                faults.unrendered_total_reads -= 1;
                return Ok(None);
            }
        }
        let state = self.state.lock();
        if !self.exists(&state, &node) {
            return Ok(None);
        }

        let text = match node {
            Node::Title(step) | Node::Container(step) => self.fixture.title(step).to_string(),
            Node::Error => state.error.clone().unwrap_or_default(),
            Node::NextButton(_) => "Next".to_string(),
            Node::CheckboxLabel(label) => label,
            Node::ProgressExternal => {
                state.current().map(|s| s.order().to_string()).unwrap_or_default()
            }
            Node::ProgressTotal => Step::ALL.len().to_string(),
            Node::Heading(name) => name,
            Node::Input(_) | Node::CheckboxInput(_) => String::new(),
            Node::ProgressInternal | Node::ProgressValue | Node::Missing => String::new(),
        };
        Ok(Some(text))
    }

    async fn attribute(&self, locator: &Locator, name: &str) -> E2eResult<Option<String>> {
        let node = self.resolve(locator);
        let state = self.state.lock();
        if !self.exists(&state, &node) {
            return Ok(None);
        }
        let current = match state.current() {
            Some(step) => step,
            None => return Ok(None),
        };
        let progress = Progress::expected(current.order(), Step::ALL.len() as u32);

        let value = match (node, name) {
            (Node::Container(step), "class") => {
                let mut class = format!("steps {}", self.fixture.step_key(step));
                if state.exited.contains(&step) {
                    class.push(' ');
                    class.push_str(selectors::EXIT_MARKER);
                }
                Some(class)
            }
            (Node::ProgressInternal, selectors::ATTR_CURRENT_STEP) => {
                Some(progress.internal.to_string())
            }
            (Node::ProgressValue, selectors::ATTR_CURRENT_PROGRESS) => {
                Some(progress.percent.to_string())
            }
            (Node::ProgressExternal, "data-form-progress-current-step") => {
                Some(progress.external.to_string())
            }
            _ => None,
        };
        Ok(value)
    }

    async fn input_value(&self, locator: &Locator) -> E2eResult<String> {
        match self.resolve(locator) {
            Node::Input(field) => Ok(self
                .state
                .lock()
                .values
                .get(&field)
                .cloned()
                .unwrap_or_default()),
            _ => Err(E2eError::Playwright(format!(
                "{} is not an <input> element",
                locator
            ))),
        }
    }

    async fn capture_failure(&self, name: &str) -> E2eResult<Vec<PathBuf>> {
        debug!("Simulated session keeps no artifacts for {}", name);
        Ok(Vec::new())
    }

    async fn close(&self) -> E2eResult<()> {
        Ok(())
    }
}

/// Hands out a fresh simulated form per scenario attempt.
pub struct SimulatedLauncher {
    fixture: Arc<Fixture>,
    thank_you_url: String,
}

impl SimulatedLauncher {
    pub fn new(fixture: Arc<Fixture>, thank_you_url: impl Into<String>) -> Self {
        Self {
            fixture,
            thank_you_url: thank_you_url.into(),
        }
    }
}

#[async_trait]
impl Launcher for SimulatedLauncher {
    async fn launch(&self, label: &str) -> E2eResult<Arc<dyn Browser>> {
        debug!("Launching simulated form for {}", label);
        Ok(Arc::new(SimulatedForm::new(
            self.fixture.clone(),
            self.thank_you_url.clone(),
        )))
    }
}
