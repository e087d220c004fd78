//! Typed fixture record
//!
//! The JSON fixture holds every literal the scenarios type into the form and
//! every text they expect back. It is parsed into [`Fixture`] once per run and
//! validated up front so that a missing or blank entry fails the run before
//! any browser is started.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{E2eError, E2eResult};
use crate::step::{FieldName, Step};

const BUILTIN: &str = include_str!("../testdata/testdata.json");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fixture {
    /// DOM key of each step (`.steps.<key>`, `btn-<key>`)
    pub steps: PerStep,
    pub titles: PerStep,
    pub valid_inputs: ValidInputs,
    pub invalid_inputs: InvalidInputs,
    pub checkboxes: Checkboxes,
    pub validation: Validation,
    pub thank_you: ThankYou,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerStep {
    pub step_1: String,
    pub step_2: String,
    pub step_3: String,
    pub step_4: String,
    pub step_5: String,
}

impl PerStep {
    pub fn get(&self, step: Step) -> &str {
        match step {
            Step::ZipCode => &self.step_1,
            Step::Interests => &self.step_2,
            Step::PropertyType => &self.step_3,
            Step::Contact => &self.step_4,
            Step::Phone => &self.step_5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidInputs {
    pub zip: String,
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidInputs {
    pub zip_empty: String,
    pub zip_short: String,
    pub zip_long: String,
    pub name_empty: String,
    pub name_short: String,
    pub name_invalid: String,
    pub email_empty: String,
    pub email_invalid: String,
    pub phone_empty: String,
    pub phone_short: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkboxes {
    pub other: String,
    pub safety: String,
    pub rental_property: String,
    pub mobile_home: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Validation {
    pub step_1: ZipMessages,
    pub step_3: CheckboxMessages,
    pub step_4: NameMessages,
    pub step_5: PhoneMessages,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZipMessages {
    pub empty: String,
    pub wrong: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckboxMessages {
    pub choose: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameMessages {
    pub empty_name: String,
    pub short_name: String,
    pub invalid_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhoneMessages {
    pub empty_phone: String,
    pub wrong_phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThankYou {
    pub heading: String,
}

/// A named checkbox of step 2 or step 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckboxKey {
    Other,
    Safety,
    RentalProperty,
    MobileHome,
}

impl CheckboxKey {
    pub const ALL: [CheckboxKey; 4] = [
        CheckboxKey::Other,
        CheckboxKey::Safety,
        CheckboxKey::RentalProperty,
        CheckboxKey::MobileHome,
    ];

    /// The step whose group this checkbox belongs to.
    pub fn step(self) -> Step {
        match self {
            CheckboxKey::Other | CheckboxKey::Safety => Step::Interests,
            CheckboxKey::RentalProperty | CheckboxKey::MobileHome => Step::PropertyType,
        }
    }
}

/// Reference to a literal input, written `valid.<field>` or `invalid.<key>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum InputRef {
    Valid(FieldName),
    ZipEmpty,
    ZipShort,
    ZipLong,
    NameEmpty,
    NameShort,
    NameInvalid,
    EmailEmpty,
    EmailInvalid,
    PhoneEmpty,
    PhoneShort,
}

impl InputRef {
    /// The field this literal is meant for.
    pub fn field(self) -> FieldName {
        match self {
            InputRef::Valid(field) => field,
            InputRef::ZipEmpty | InputRef::ZipShort | InputRef::ZipLong => FieldName::Zip,
            InputRef::NameEmpty | InputRef::NameShort | InputRef::NameInvalid => FieldName::Name,
            InputRef::EmailEmpty | InputRef::EmailInvalid => FieldName::Email,
            InputRef::PhoneEmpty | InputRef::PhoneShort => FieldName::Phone,
        }
    }
}

impl FromStr for InputRef {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = match s {
            "valid.zip" => InputRef::Valid(FieldName::Zip),
            "valid.name" => InputRef::Valid(FieldName::Name),
            "valid.email" => InputRef::Valid(FieldName::Email),
            "valid.phone" => InputRef::Valid(FieldName::Phone),
            "invalid.zip_empty" => InputRef::ZipEmpty,
            "invalid.zip_short" => InputRef::ZipShort,
            "invalid.zip_long" => InputRef::ZipLong,
            "invalid.name_empty" => InputRef::NameEmpty,
            "invalid.name_short" => InputRef::NameShort,
            "invalid.name_invalid" => InputRef::NameInvalid,
            "invalid.email_empty" => InputRef::EmailEmpty,
            "invalid.email_invalid" => InputRef::EmailInvalid,
            "invalid.phone_empty" => InputRef::PhoneEmpty,
            "invalid.phone_short" => InputRef::PhoneShort,
            other => {
                return Err(E2eError::ScenarioParse(format!(
                    "Unknown input reference '{}'",
                    other
                )))
            }
        };
        Ok(parsed)
    }
}

impl TryFrom<String> for InputRef {
    type Error = E2eError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<InputRef> for String {
    fn from(value: InputRef) -> Self {
        value.to_string()
    }
}

impl fmt::Display for InputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InputRef::Valid(field) => return write!(f, "valid.{}", field),
            InputRef::ZipEmpty => "invalid.zip_empty",
            InputRef::ZipShort => "invalid.zip_short",
            InputRef::ZipLong => "invalid.zip_long",
            InputRef::NameEmpty => "invalid.name_empty",
            InputRef::NameShort => "invalid.name_short",
            InputRef::NameInvalid => "invalid.name_invalid",
            InputRef::EmailEmpty => "invalid.email_empty",
            InputRef::EmailInvalid => "invalid.email_invalid",
            InputRef::PhoneEmpty => "invalid.phone_empty",
            InputRef::PhoneShort => "invalid.phone_short",
        };
        f.write_str(s)
    }
}

/// Reference to an expected validation message, written `<step>.<kind>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MessageRef {
    ZipEmpty,
    ZipWrong,
    ChooseOne,
    NameEmpty,
    NameShort,
    NameInvalid,
    PhoneEmpty,
    PhoneWrong,
}

impl MessageRef {
    pub fn step(self) -> Step {
        match self {
            MessageRef::ZipEmpty | MessageRef::ZipWrong => Step::ZipCode,
            MessageRef::ChooseOne => Step::PropertyType,
            MessageRef::NameEmpty | MessageRef::NameShort | MessageRef::NameInvalid => {
                Step::Contact
            }
            MessageRef::PhoneEmpty | MessageRef::PhoneWrong => Step::Phone,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            MessageRef::ZipEmpty => "step_1.empty",
            MessageRef::ZipWrong => "step_1.wrong",
            MessageRef::ChooseOne => "step_3.choose",
            MessageRef::NameEmpty => "step_4.empty_name",
            MessageRef::NameShort => "step_4.short_name",
            MessageRef::NameInvalid => "step_4.invalid_name",
            MessageRef::PhoneEmpty => "step_5.empty_phone",
            MessageRef::PhoneWrong => "step_5.wrong_phone",
        }
    }
}

impl FromStr for MessageRef {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            MessageRef::ZipEmpty,
            MessageRef::ZipWrong,
            MessageRef::ChooseOne,
            MessageRef::NameEmpty,
            MessageRef::NameShort,
            MessageRef::NameInvalid,
            MessageRef::PhoneEmpty,
            MessageRef::PhoneWrong,
        ]
        .into_iter()
        .find(|m| m.as_str() == s)
        .ok_or_else(|| E2eError::ScenarioParse(format!("Unknown validation message '{}'", s)))
    }
}

impl TryFrom<String> for MessageRef {
    type Error = E2eError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MessageRef> for String {
    fn from(value: MessageRef) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for MessageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Fixture {
    /// Parse and validate a fixture from a JSON string
    pub fn from_json(json: &str) -> E2eResult<Self> {
        let fixture: Fixture = serde_json::from_str(json)
            .map_err(|e| E2eError::FixtureInvalid(format!("schema: {}", e)))?;
        fixture.validate()?;
        Ok(fixture)
    }

    /// Parse and validate a fixture from a JSON file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// The fixture shipped with the suite
    pub fn builtin() -> E2eResult<Self> {
        Self::from_json(BUILTIN)
    }

    /// Reject blank entries and ambiguous keys.
    ///
    /// Inputs in `invalid_inputs` may legitimately be empty; everything the
    /// scenarios locate by or compare against may not.
    pub fn validate(&self) -> E2eResult<()> {
        let mut blank = Vec::new();
        let mut check = |path: String, value: &str| {
            if value.trim().is_empty() {
                blank.push(path);
            }
        };

        for step in Step::ALL {
            check(format!("steps.{}", step), self.steps.get(step));
            check(format!("titles.{}", step), self.titles.get(step));
        }
        for field in [FieldName::Zip, FieldName::Name, FieldName::Email, FieldName::Phone] {
            check(format!("valid_inputs.{}", field), self.input(InputRef::Valid(field)));
        }
        for key in CheckboxKey::ALL {
            check(format!("checkboxes.{:?}", key), self.checkbox(key));
        }
        for message in [
            MessageRef::ZipEmpty,
            MessageRef::ZipWrong,
            MessageRef::ChooseOne,
            MessageRef::NameEmpty,
            MessageRef::NameShort,
            MessageRef::NameInvalid,
            MessageRef::PhoneEmpty,
            MessageRef::PhoneWrong,
        ] {
            check(format!("validation.{}", message), self.message(message));
        }
        check("thank_you.heading".to_string(), &self.thank_you.heading);

        if !blank.is_empty() {
            return Err(E2eError::FixtureInvalid(format!(
                "blank entries: {}",
                blank.join(", ")
            )));
        }

        let keys: HashSet<&str> = Step::ALL.iter().map(|s| self.steps.get(*s)).collect();
        if keys.len() != Step::ALL.len() {
            return Err(E2eError::FixtureInvalid(
                "step keys must be distinct".to_string(),
            ));
        }

        let labels: HashSet<&str> = CheckboxKey::ALL.iter().map(|k| self.checkbox(*k)).collect();
        if labels.len() != CheckboxKey::ALL.len() {
            return Err(E2eError::FixtureInvalid(
                "checkbox labels must be distinct".to_string(),
            ));
        }

        Ok(())
    }

    /// DOM key of a step
    pub fn step_key(&self, step: Step) -> &str {
        self.steps.get(step)
    }

    /// Reverse lookup from DOM key to step
    pub fn step_for_key(&self, key: &str) -> Option<Step> {
        Step::ALL.into_iter().find(|s| self.steps.get(*s) == key)
    }

    pub fn title(&self, step: Step) -> &str {
        self.titles.get(step)
    }

    pub fn input(&self, input: InputRef) -> &str {
        let valid = &self.valid_inputs;
        let invalid = &self.invalid_inputs;
        match input {
            InputRef::Valid(FieldName::Zip) => &valid.zip,
            InputRef::Valid(FieldName::Name) => &valid.name,
            InputRef::Valid(FieldName::Email) => &valid.email,
            InputRef::Valid(FieldName::Phone) => &valid.phone,
            // Checkbox groups have no literal; rejected when scenarios load.
            InputRef::Valid(FieldName::Checkboxes) => "",
            InputRef::ZipEmpty => &invalid.zip_empty,
            InputRef::ZipShort => &invalid.zip_short,
            InputRef::ZipLong => &invalid.zip_long,
            InputRef::NameEmpty => &invalid.name_empty,
            InputRef::NameShort => &invalid.name_short,
            InputRef::NameInvalid => &invalid.name_invalid,
            InputRef::EmailEmpty => &invalid.email_empty,
            InputRef::EmailInvalid => &invalid.email_invalid,
            InputRef::PhoneEmpty => &invalid.phone_empty,
            InputRef::PhoneShort => &invalid.phone_short,
        }
    }

    pub fn checkbox(&self, key: CheckboxKey) -> &str {
        match key {
            CheckboxKey::Other => &self.checkboxes.other,
            CheckboxKey::Safety => &self.checkboxes.safety,
            CheckboxKey::RentalProperty => &self.checkboxes.rental_property,
            CheckboxKey::MobileHome => &self.checkboxes.mobile_home,
        }
    }

    /// Reverse lookup from visible label to checkbox
    pub fn checkbox_for_label(&self, label: &str) -> Option<CheckboxKey> {
        CheckboxKey::ALL.into_iter().find(|k| self.checkbox(*k) == label)
    }

    pub fn message(&self, message: MessageRef) -> &str {
        let v = &self.validation;
        match message {
            MessageRef::ZipEmpty => &v.step_1.empty,
            MessageRef::ZipWrong => &v.step_1.wrong,
            MessageRef::ChooseOne => &v.step_3.choose,
            MessageRef::NameEmpty => &v.step_4.empty_name,
            MessageRef::NameShort => &v.step_4.short_name,
            MessageRef::NameInvalid => &v.step_4.invalid_name,
            MessageRef::PhoneEmpty => &v.step_5.empty_phone,
            MessageRef::PhoneWrong => &v.step_5.wrong_phone,
        }
    }
}
