//! DOM contract of the hosted form
//!
//! The form owns this markup; these are the only places the suite depends
//! on it.

use crate::browser::Locator;

pub const FORM_CONTAINER: &str = "#form-container-1";
pub const ZIP_INPUT: &str = "[data-zip-code-input]";
pub const NAME_INPUT: &str = "[data-name-input]";
pub const EMAIL_INPUT: &str = "input[name=\"email\"]";
pub const PHONE_INPUT: &str = "input[name=\"phone\"][type=tel]";
pub const ERROR_MESSAGE: &str = ".hasError";
pub const STEP_TITLE: &str = ".stepTitle__hdr";
pub const LABEL: &str = "label";

/// Class a step container gets once its transition out has started.
pub const EXIT_MARKER: &str = "moveLeftOut";

pub const PROGRESS_VALUE: &str = ".stepProgress [data-current-progress]";
pub const PROGRESS_EXTERNAL_STEP: &str = ".stepProgress [data-form-progress-current-step]";
pub const PROGRESS_INTERNAL_STEP: &str = ".stepProgress [data-current-step]";
pub const PROGRESS_TOTAL_STEPS: &str = ".stepProgress [data-form-progress-total-steps]";

pub const ATTR_CURRENT_PROGRESS: &str = "data-current-progress";
pub const ATTR_CURRENT_STEP: &str = "data-current-step";

const NEXT_BUTTON_PREFIX: &str = "button[data-tracking=\"btn-";
const NEXT_BUTTON_SUFFIX: &str = "\"]";
const STEP_CONTAINER_PREFIX: &str = ".steps.";

pub fn form() -> Locator {
    Locator::css(FORM_CONTAINER)
}

pub fn next_button_css(step_key: &str) -> String {
    format!("{}{}{}", NEXT_BUTTON_PREFIX, step_key, NEXT_BUTTON_SUFFIX)
}

pub fn step_container_css(step_key: &str) -> String {
    format!("{}{}", STEP_CONTAINER_PREFIX, step_key)
}

/// Step key of a next-button selector
pub fn parse_next_button(css: &str) -> Option<&str> {
    css.strip_prefix(NEXT_BUTTON_PREFIX)?.strip_suffix(NEXT_BUTTON_SUFFIX)
}

/// Step key of a step-container selector
pub fn parse_step_container(css: &str) -> Option<&str> {
    css.strip_prefix(STEP_CONTAINER_PREFIX)
}

pub fn next_button(step_key: &str) -> Locator {
    form().locator(next_button_css(step_key))
}

pub fn step_container(step_key: &str) -> Locator {
    form().locator(step_container_css(step_key))
}

pub fn step_title(step_key: &str) -> Locator {
    step_container(step_key).locator(STEP_TITLE)
}

pub fn error_message() -> Locator {
    form().locator(ERROR_MESSAGE)
}

pub fn zip_input() -> Locator {
    form().locator(ZIP_INPUT)
}

pub fn name_input() -> Locator {
    form().locator(NAME_INPUT)
}

pub fn email_input() -> Locator {
    form().locator(EMAIL_INPUT).first()
}

pub fn phone_input() -> Locator {
    form().locator(PHONE_INPUT).first()
}

pub fn checkbox_input(label: &str) -> Locator {
    form().get_by_label(label)
}

pub fn checkbox_label(label: &str) -> Locator {
    form().filter_has_text(LABEL, label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_selectors_round_trip() {
        assert_eq!(next_button_css("step-2"), "button[data-tracking=\"btn-step-2\"]");
        assert_eq!(parse_next_button(&next_button_css("step-2")), Some("step-2"));
        assert_eq!(parse_step_container(&step_container_css("step-5")), Some("step-5"));
        assert_eq!(parse_next_button(ZIP_INPUT), None);
    }
}
