//! The five stages of the form and what can be observed about them

use serde::{Deserialize, Serialize};
use std::fmt;

/// Digits the phone input keeps after masking.
pub const PHONE_MAX_DIGITS: usize = 10;

/// Largest digit count a phone-mask check may ask for.
pub const PHONE_PROBE_DIGITS: usize = 20;

/// One stage of the stepper, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Step {
    /// ZIP code
    #[serde(rename = "step_1")]
    ZipCode,
    /// Interest checkboxes
    #[serde(rename = "step_2")]
    Interests,
    /// Property-type checkboxes
    #[serde(rename = "step_3")]
    PropertyType,
    /// Name and email
    #[serde(rename = "step_4")]
    Contact,
    /// Phone number
    #[serde(rename = "step_5")]
    Phone,
}

impl Step {
    pub const ALL: [Step; 5] = [
        Step::ZipCode,
        Step::Interests,
        Step::PropertyType,
        Step::Contact,
        Step::Phone,
    ];

    /// 1-based position in the form.
    pub fn order(self) -> u32 {
        match self {
            Step::ZipCode => 1,
            Step::Interests => 2,
            Step::PropertyType => 3,
            Step::Contact => 4,
            Step::Phone => 5,
        }
    }

    pub fn from_order(order: u32) -> Option<Step> {
        Step::ALL.iter().copied().find(|s| s.order() == order)
    }

    /// Stable key used by fixtures and scenario files.
    pub fn key(self) -> &'static str {
        match self {
            Step::ZipCode => "step_1",
            Step::Interests => "step_2",
            Step::PropertyType => "step_3",
            Step::Contact => "step_4",
            Step::Phone => "step_5",
        }
    }

    pub fn next(self) -> Option<Step> {
        Step::from_order(self.order() + 1)
    }

    /// Steps that must be completed before this one is reached.
    pub fn predecessors(self) -> impl Iterator<Item = Step> {
        Step::ALL.into_iter().take_while(move |s| *s < self)
    }

    pub fn fields(self) -> &'static [Field] {
        match self {
            Step::ZipCode => &[Field {
                name: FieldName::Zip,
                kind: FieldKind::Text,
                intent: "ZIP code input",
                constraint: None,
            }],
            Step::Interests => &[Field {
                name: FieldName::Checkboxes,
                kind: FieldKind::Checkbox,
                intent: "interest checkboxes, by label",
                constraint: None,
            }],
            Step::PropertyType => &[Field {
                name: FieldName::Checkboxes,
                kind: FieldKind::Checkbox,
                intent: "property type checkboxes, by label",
                constraint: None,
            }],
            Step::Contact => &[
                Field {
                    name: FieldName::Name,
                    kind: FieldKind::Text,
                    intent: "full name input",
                    constraint: None,
                },
                Field {
                    name: FieldName::Email,
                    kind: FieldKind::Email,
                    intent: "first email input",
                    constraint: None,
                },
            ],
            Step::Phone => &[Field {
                name: FieldName::Phone,
                kind: FieldKind::Tel,
                intent: "first telephone input",
                constraint: Some(Constraint::MaxDigits(PHONE_MAX_DIGITS)),
            }],
        }
    }

    /// The step a field lives on, if it is a single-step field.
    pub fn of_field(name: FieldName) -> Option<Step> {
        Step::ALL
            .into_iter()
            .find(|s| s.fields().iter().any(|f| f.name == name) && name != FieldName::Checkboxes)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    Zip,
    Name,
    Email,
    Phone,
    Checkboxes,
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FieldName::Zip => "zip",
            FieldName::Name => "name",
            FieldName::Email => "email",
            FieldName::Phone => "phone",
            FieldName::Checkboxes => "checkboxes",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Email,
    Tel,
    Checkbox,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// Input is masked down to this many digits
    MaxDigits(usize),
}

/// One input surface of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: FieldName,
    pub kind: FieldKind,
    pub intent: &'static str,
    pub constraint: Option<Constraint>,
}

/// What submitting a step produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Container carries the exit marker and no error node is shown
    Success,
    /// Still on the step; the message is absent when the form stays silent
    Failure { message: Option<String> },
}

impl TransitionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TransitionOutcome::Success)
    }
}

/// The three synchronized representations of the progress widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// 1-based step counter shown to the user
    pub external: u32,
    /// 0-based step counter in `data-current-step`
    pub internal: u32,
    /// `round(step / total * 100)`
    pub percent: u32,
}

impl Progress {
    pub fn expected(step: u32, total_steps: u32) -> Self {
        let percent = if total_steps == 0 {
            0
        } else {
            ((step as f64 / total_steps as f64) * 100.0).round() as u32
        };

        Self {
            external: step,
            internal: step.saturating_sub(1),
            percent,
        }
    }
}
