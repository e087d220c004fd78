//! Stepper Form E2E Test Framework
//!
//! This crate drives a five-step lead-capture form end to end:
//! - Talks to a real browser through a persistent Playwright bridge process
//! - Wraps the form in page objects with auto-retrying assertions
//! - Parses declarative YAML scenarios that reference a JSON fixture
//! - Runs scenarios with whole-scenario retries and writes a JSON report
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── preflight() -> GET entry URL                         │
//! │    ├── launcher.launch() -> Arc<dyn Browser>                │
//! │    │     ├── PlaywrightSession (node bridge, NDJSON)        │
//! │    │     └── SimulatedForm (in-memory)                      │
//! │    └── run_scenario(scenario) -> ScenarioResult             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  PageManager                                                │
//! │    ├── CommonPage    titles, next button, progress          │
//! │    ├── StepperPage   fields, checkboxes, phone mask         │
//! │    └── ThankYouPage  final URL and heading                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Scenario (YAML)                                            │
//! │    ├── name, description, tags                              │
//! │    └── steps: [{ name, actions }]                           │
//! │          ├── fill { field, input: valid.zip }               │
//! │          ├── select_checkbox { checkbox }                   │
//! │          ├── advance { step }                               │
//! │          ├── expect_failure { step, message: step_1.empty } │
//! │          └── navigate_to { step }                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod browser;
pub mod config;
pub mod error;
pub mod expect;
pub mod fixture;
pub mod pages;
pub mod playwright;
pub mod runner;
pub mod scenario;
pub mod selectors;
pub mod simulator;
pub mod step;

pub use browser::{Browser, Launcher, Locator};
pub use config::SuiteConfig;
pub use error::{E2eError, E2eResult};
pub use fixture::Fixture;
pub use pages::PageManager;
pub use runner::{ScenarioResult, TestRunner, TestSuiteResult};
pub use scenario::{Action, Scenario};
pub use step::{Step, TransitionOutcome};
