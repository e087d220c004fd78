//! Declarative YAML scenarios
//!
//! A scenario is an ordered list of named steps, each an ordered list of
//! actions against the form. Inputs and expected messages are referenced by
//! fixture key, never spelled out, so the same file runs against any
//! fixture.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{E2eError, E2eResult};
use crate::fixture::{CheckboxKey, InputRef, MessageRef};
use crate::step::{FieldName, Step, PHONE_MAX_DIGITS, PHONE_PROBE_DIGITS};

const BUILTIN: &[(&str, &str)] = &[
    ("zip-code.yaml", include_str!("../scenarios/zip-code.yaml")),
    ("checkboxes.yaml", include_str!("../scenarios/checkboxes.yaml")),
    ("name.yaml", include_str!("../scenarios/name.yaml")),
    ("email.yaml", include_str!("../scenarios/email.yaml")),
    ("phone.yaml", include_str!("../scenarios/phone.yaml")),
    ("progress.yaml", include_str!("../scenarios/progress.yaml")),
    ("end-to-end.yaml", include_str!("../scenarios/end-to-end.yaml")),
];

/// A complete scenario parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique name for this scenario
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering scenarios
    #[serde(default)]
    pub tags: Vec<String>,

    /// Named groups of actions, executed in order
    pub steps: Vec<ScenarioStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioStep {
    pub name: String,
    pub actions: Vec<Action>,
}

/// A single interaction or assertion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Title of `step` is visible with the fixture text
    ExpectTitle { step: Step },

    /// Progress widget agrees with `step`'s position
    ExpectProgress { step: Step },

    /// Type a fixture input into a field
    Fill { field: FieldName, input: InputRef },

    /// Tick a checkbox through its label
    SelectCheckbox { checkbox: CheckboxKey },

    /// Press the step's next control
    Advance { step: Step },

    /// Step transitioned out without an error
    ExpectSuccess { step: Step },

    /// Step stayed put and shows the message
    ExpectFailure { step: Step, message: MessageRef },

    /// Valid-input walk from step 1 to `step`
    NavigateTo { step: Step },

    /// Fill `step` with valid inputs and submit it
    Complete { step: Step },

    /// Phone mask keeps exactly `max` digits
    ExpectPhoneMaxDigits {
        #[serde(default = "default_max_digits")]
        max: usize,
    },

    /// Redirected to the confirmation page
    ExpectThankYou,

    /// Log a message (for debugging)
    Log { message: String },
}

fn default_max_digits() -> usize {
    PHONE_MAX_DIGITS
}

impl Action {
    /// Short label used in logs and reports
    pub fn label(&self) -> String {
        match self {
            Action::ExpectTitle { step } => format!("expect_title:{}", step),
            Action::ExpectProgress { step } => format!("expect_progress:{}", step),
            Action::Fill { field, input } => format!("fill:{}={}", field, input),
            Action::SelectCheckbox { checkbox } => format!("select_checkbox:{:?}", checkbox),
            Action::Advance { step } => format!("advance:{}", step),
            Action::ExpectSuccess { step } => format!("expect_success:{}", step),
            Action::ExpectFailure { step, message } => format!("expect_failure:{}:{}", step, message),
            Action::NavigateTo { step } => format!("navigate_to:{}", step),
            Action::Complete { step } => format!("complete:{}", step),
            Action::ExpectPhoneMaxDigits { max } => format!("expect_phone_max_digits:{}", max),
            Action::ExpectThankYou => "expect_thank_you".to_string(),
            Action::Log { message } => format!("log:{}", message.chars().take(30).collect::<String>()),
        }
    }
}

impl Scenario {
    /// Parse a scenario from YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let scenario: Scenario = serde_yaml::from_str(yaml)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Parse a scenario from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| E2eError::ScenarioParse(format!("{}: {}", path.display(), e)))
    }

    /// Load all scenarios from a directory
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        if !dir.is_dir() {
            return Err(E2eError::Configuration(format!(
                "Scenario directory not found: {}",
                dir.display()
            )));
        }

        let mut scenarios = Vec::new();

        for entry in walkdir::WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                E2eError::Configuration(format!("Reading {}: {}", dir.display(), e))
            })?;
            let is_yaml = entry
                .path()
                .extension()
                .map(|ext| ext == "yaml" || ext == "yml")
                .unwrap_or(false);
            if is_yaml {
                scenarios.push(Self::from_file(entry.path())?);
            }
        }

        Ok(scenarios)
    }

    /// Scenarios shipped with the suite
    pub fn builtin() -> E2eResult<Vec<Self>> {
        BUILTIN
            .iter()
            .map(|(name, yaml)| {
                Self::from_yaml(yaml).map_err(|e| E2eError::ScenarioParse(format!("{}: {}", name, e)))
            })
            .collect()
    }

    /// Filter scenarios by tag
    pub fn filter_by_tag<'a>(scenarios: &'a [Self], tag: &str) -> Vec<&'a Self> {
        scenarios.iter().filter(|s| s.tags.iter().any(|t| t == tag)).collect()
    }

    /// Every action across all steps, in execution order
    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.steps.iter().flat_map(|s| s.actions.iter())
    }

    /// Reject references that cannot line up with the form.
    pub fn validate(&self) -> E2eResult<()> {
        if self.name.trim().is_empty() {
            return Err(E2eError::ScenarioParse("scenario without a name".to_string()));
        }
        if self.steps.is_empty() {
            return Err(E2eError::ScenarioParse(format!("{}: no steps", self.name)));
        }

        for step in &self.steps {
            let at = |detail: String| {
                E2eError::ScenarioParse(format!("{} / {}: {}", self.name, step.name, detail))
            };

            for action in &step.actions {
                match action {
                    Action::ExpectFailure { step, message } if message.step() != *step => {
                        return Err(at(format!(
                            "message {} belongs to {}, not {}",
                            message,
                            message.step(),
                            step
                        )));
                    }
                    Action::Fill { field, .. } if *field == FieldName::Checkboxes => {
                        return Err(at("checkboxes are selected, not filled".to_string()));
                    }
                    Action::Fill { field, input } if input.field() != *field => {
                        return Err(at(format!("{} is not an input for {}", input, field)));
                    }
                    Action::ExpectPhoneMaxDigits { max } if !(1..=PHONE_PROBE_DIGITS).contains(max) => {
                        return Err(at(format!(
                            "max digits must be between 1 and {}, got {}",
                            PHONE_PROBE_DIGITS, max
                        )));
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_parse_simple_scenario() {
        let yaml = r#"
name: zip-code-empty
description: Empty ZIP is refused
tags:
  - validation
  - smoke
steps:
  - name: Validate empty ZIP code
    actions:
      - action: fill
        field: zip
        input: invalid.zip_empty
      - action: advance
        step: step_1
      - action: expect_failure
        step: step_1
        message: step_1.empty
"#;
        let scenario = Scenario::from_yaml(yaml).unwrap();
        assert_eq!(scenario.name, "zip-code-empty");
        assert_eq!(scenario.steps.len(), 1);
        assert_eq!(
            scenario.steps[0].actions[0],
            Action::Fill {
                field: FieldName::Zip,
                input: InputRef::ZipEmpty
            }
        );
        assert_eq!(
            scenario.steps[0].actions[2],
            Action::ExpectFailure {
                step: Step::ZipCode,
                message: MessageRef::ZipEmpty
            }
        );
    }

    #[test]
    fn test_defaults_and_unit_actions() {
        let yaml = r#"
name: mask
steps:
  - name: Phone mask
    actions:
      - action: navigate_to
        step: step_5
      - action: expect_phone_max_digits
      - action: expect_thank_you
"#;
        let scenario = Scenario::from_yaml(yaml).unwrap();
        let actions: Vec<_> = scenario.actions().cloned().collect();
        assert_eq!(actions[1], Action::ExpectPhoneMaxDigits { max: 10 });
        assert_eq!(actions[2], Action::ExpectThankYou);
        assert!(scenario.tags.is_empty());
    }

    #[test]
    fn test_message_from_other_step_is_rejected() {
        let yaml = r#"
name: mismatched
steps:
  - name: Wrong message
    actions:
      - action: expect_failure
        step: step_3
        message: step_1.empty
"#;
        let err = Scenario::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("belongs to step_1"), "{err}");
    }

    #[test]
    fn test_input_for_other_field_is_rejected() {
        let yaml = r#"
name: mismatched
steps:
  - name: Wrong input
    actions:
      - action: fill
        field: phone
        input: valid.zip
"#;
        assert!(Scenario::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_unknown_reference_is_rejected() {
        let yaml = r#"
name: unknown
steps:
  - name: Bad ref
    actions:
      - action: fill
        field: zip
        input: invalid.zip_negative
"#;
        assert!(Scenario::from_yaml(yaml).is_err());
    }

    #[test_case(0 ; "zero")]
    #[test_case(21 ; "above probe length")]
    #[test_case(usize::MAX ; "overflowing")]
    fn test_phone_max_digits_out_of_range_is_rejected(max: usize) {
        let yaml = format!(
            "name: mask\nsteps:\n  - name: s\n    actions:\n      - action: expect_phone_max_digits\n        max: {}\n",
            max
        );
        let err = Scenario::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("max digits must be between 1 and 20"), "{err}");
    }

    #[test]
    fn test_missing_directory_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Scenario::load_all(&dir.path().join("scenarois")).unwrap_err();
        assert!(matches!(err, E2eError::Configuration(_)), "{err}");
    }

    #[test]
    fn test_builtin_scenarios_load() {
        let scenarios = Scenario::builtin().unwrap();
        assert_eq!(scenarios.len(), BUILTIN.len());

        let names: Vec<_> = scenarios.iter().map(|s| s.name.as_str()).collect();
        assert!(names.contains(&"end-to-end-flow"));
        assert!(names.contains(&"zip-code-validation"));

        let validation = Scenario::filter_by_tag(&scenarios, "validation");
        assert!(validation.len() >= 5);
    }

    #[test]
    fn test_load_all_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("b.yaml"),
            "name: b\nsteps:\n  - name: s\n    actions:\n      - action: expect_title\n        step: step_1\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("a.yml"),
            "name: a\nsteps:\n  - name: s\n    actions:\n      - action: log\n        message: hi\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let scenarios = Scenario::load_all(dir.path()).unwrap();
        let names: Vec<_> = scenarios.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
