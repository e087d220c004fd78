//! Page objects over the capability interface

pub mod common;
pub mod manager;
pub mod stepper;
pub mod thank_you;

pub use common::CommonPage;
pub use manager::PageManager;
pub use stepper::StepperPage;
pub use thank_you::ThankYouPage;
