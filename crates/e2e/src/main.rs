//! Stepper E2E runner entry point
//!
//! Loads the suite configuration from the environment (and `.env`), picks
//! the scenarios to run and drives them through Playwright, or through the
//! in-memory form with `--simulate`.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use stepper_e2e::browser::Launcher;
use stepper_e2e::playwright::{BrowserKind, PlaywrightConfig, PlaywrightLauncher};
use stepper_e2e::simulator::SimulatedLauncher;
use stepper_e2e::{runner, Fixture, Scenario, SuiteConfig, TestRunner};

const SIMULATED_ENTRY: &str = "http://stepper.local/";
const SIMULATED_THANK_YOU: &str = "http://stepper.local/thank-you";

#[derive(Parser, Debug)]
#[command(name = "stepper-e2e")]
#[command(author, version, about = "E2E test runner for the stepper lead form")]
struct Args {
    /// Fixture JSON with step keys, titles, inputs and messages
    #[arg(long)]
    fixture: Option<PathBuf>,

    /// Directory of scenario YAML files (built-in scenarios when omitted)
    #[arg(short, long)]
    scenarios: Option<PathBuf>,

    /// Run only scenarios carrying this tag
    #[arg(short, long)]
    tag: Option<String>,

    /// Run only the scenario with this name (refused in CI)
    #[arg(short, long)]
    name: Option<String>,

    /// Browser to use (chromium, firefox, webkit)
    #[arg(long, env = "STEPPER_BROWSER", default_value = "chromium")]
    browser: BrowserKind,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Directory whose node_modules provides playwright
    #[arg(long, default_value = ".")]
    node_project: PathBuf,

    /// Output directory for results and artifacts
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Run against the in-memory form instead of a browser
    #[arg(long)]
    simulate: bool,

    /// Skip the HTTP reachability check of the entry URL
    #[arg(long)]
    no_preflight: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// List the selected scenarios and exit
    #[arg(long)]
    list: bool,
}

fn main() {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {}", e);
            std::process::exit(2);
        }
    };

    match rt.block_on(async_main(args)) {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(2);
        }
    }
}

async fn async_main(args: Args) -> anyhow::Result<bool> {
    let fixture = match &args.fixture {
        Some(path) => Fixture::from_file(path),
        None => Fixture::builtin(),
    }
    .context("loading fixture")?;
    let fixture = Arc::new(fixture);

    let scenarios = match &args.scenarios {
        Some(dir) => Scenario::load_all(dir),
        None => Scenario::builtin(),
    }
    .context("loading scenarios")?;

    if args.list {
        let selected = runner::select(&scenarios, args.tag.as_deref(), args.name.as_deref(), false)?;
        for scenario in selected {
            let steps: Vec<String> = runner::steps_touched(scenario)
                .iter()
                .map(|s| s.to_string())
                .collect();
            println!(
                "{:<24} [{}] {}  ({})",
                scenario.name,
                scenario.tags.join(","),
                scenario.description,
                steps.join(" ")
            );
        }
        return Ok(true);
    }

    let mut config = if args.simulate {
        stepper_e2e::config::load_dotenv()?;
        SuiteConfig::from_lookup(|key| {
            std::env::var(key).ok().or_else(|| match key {
                "URL" => Some(SIMULATED_ENTRY.to_string()),
                "URL_THANKYOU" => Some(SIMULATED_THANK_YOU.to_string()),
                _ => None,
            })
        })?
    } else {
        SuiteConfig::from_env()?
    };
    config.browser = args.browser;
    config.headless = !args.headed;
    if let Some(output) = args.output {
        config.output_dir = output;
    }

    let selected: Vec<Scenario> =
        runner::select(&scenarios, args.tag.as_deref(), args.name.as_deref(), config.ci_mode)?
            .into_iter()
            .cloned()
            .collect();

    let launcher: Arc<dyn Launcher> = if args.simulate {
        Arc::new(SimulatedLauncher::new(fixture.clone(), config.thank_you_url.clone()))
    } else {
        Arc::new(PlaywrightLauncher::new(PlaywrightConfig {
            browser: config.browser,
            headless: config.headless,
            action_timeout: config.action_timeout,
            artifact_dir: config.output_dir.join("artifacts"),
            node_project_dir: args.node_project,
            ..Default::default()
        })?)
    };

    let test_runner = TestRunner::new(config, fixture, launcher);

    if !args.simulate && !args.no_preflight {
        test_runner.preflight().await?;
    }

    let results = test_runner.run_all(&selected).await;
    test_runner.write_results(&results)?;

    Ok(results.success())
}
