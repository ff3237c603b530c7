use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use storefront_actions::prelude::*;
use tracing_subscriber::EnvFilter;
#[cfg(feature = "otel")]
use tracing_subscriber::layer::SubscriberExt;
#[cfg(feature = "otel")]
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "storefront-actions")]
#[command(about = "Run natural-language tests against an e-commerce storefront", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single test instruction
    Run {
        /// Natural-language test instruction
        #[arg(value_name = "INSTRUCTION")]
        instruction: String,

        /// Storefront base URL (overrides STOREFRONT_URL)
        #[arg(short, long)]
        base_url: Option<String>,

        /// Storefront profile YAML with selector overrides
        #[arg(short, long)]
        profile: Option<PathBuf>,

        /// Run the browser without a visible window
        #[arg(long)]
        headless: bool,

        /// Parse with keyword rules only, skipping any LLM call
        #[arg(long)]
        no_llm: bool,

        /// Stop at the first failed action
        #[arg(short, long)]
        fail_fast: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse an instruction and print the action plan without running it
    Parse {
        /// Natural-language test instruction
        #[arg(value_name = "INSTRUCTION")]
        instruction: String,

        /// Parse with keyword rules only, skipping any LLM call
        #[arg(long)]
        no_llm: bool,

        /// Print the actions as JSON
        #[arg(long)]
        json: bool,
    },

    /// Read instruction blocks from stdin and run each one
    Interactive {
        /// Storefront base URL (overrides STOREFRONT_URL)
        #[arg(short, long)]
        base_url: Option<String>,

        /// Storefront profile YAML with selector overrides
        #[arg(short, long)]
        profile: Option<PathBuf>,

        /// Run the browser without a visible window
        #[arg(long)]
        headless: bool,

        /// Parse with keyword rules only, skipping any LLM call
        #[arg(long)]
        no_llm: bool,
    },
}

#[cfg(feature = "otel")]
fn init_otel_tracing(verbose: bool) {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::runtime::Tokio;
    use opentelemetry_sdk::trace::TracerProvider;

    let filter = if verbose {
        "storefront_actions=debug"
    } else {
        "storefront_actions=info"
    };

    let otlp_endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .unwrap_or_else(|_| "http://localhost:4317".to_string());

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&otlp_endpoint)
        .build()
        .expect("Failed to create OTLP exporter");

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, Tokio)
        .build();

    let tracer = provider.tracer("storefront-actions");
    let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

    tracing_subscriber::registry()
        .with(EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer())
        .with(otel_layer)
        .init();

    opentelemetry::global::set_tracer_provider(provider);
}

#[cfg(not(feature = "otel"))]
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        "storefront_actions=debug"
    } else {
        "storefront_actions=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    #[cfg(feature = "otel")]
    init_otel_tracing(cli.verbose);

    #[cfg(not(feature = "otel"))]
    init_tracing(cli.verbose);

    let result = run(cli).await;

    #[cfg(feature = "otel")]
    opentelemetry::global::shutdown_tracer_provider();

    match result {
        Ok(success) => {
            if success {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Run failed");
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    match cli.command {
        Commands::Run {
            instruction,
            base_url,
            profile,
            headless,
            no_llm,
            fail_fast,
            json,
        } => run_instruction(instruction, base_url, profile, headless, no_llm, fail_fast, json).await,
        Commands::Parse {
            instruction,
            no_llm,
            json,
        } => parse_instruction(instruction, no_llm, json).await,
        Commands::Interactive {
            base_url,
            profile,
            headless,
            no_llm,
        } => interactive(base_url, profile, headless, no_llm).await,
    }
}

fn build_settings(base_url: Option<String>, headless: bool) -> Settings {
    let mut settings = Settings::from_env();
    if let Some(url) = base_url {
        settings.base_url = url;
    }
    if headless {
        settings.headless = true;
    }
    settings
}

fn load_profile(path: Option<PathBuf>) -> anyhow::Result<StorefrontProfile> {
    match path {
        Some(p) => {
            println!("Using profile: {}\n", p.display());
            Ok(StorefrontProfile::load(&p)?)
        }
        None => Ok(StorefrontProfile::default()),
    }
}

fn build_parser(no_llm: bool) -> Box<dyn InstructionParser> {
    if no_llm {
        return Box::new(RuleParser::new());
    }
    match LlmParser::from_env() {
        Some(parser) => Box::new(parser),
        None => {
            tracing::warn!("No LLM API key configured, using keyword rules");
            Box::new(RuleParser::new())
        }
    }
}

async fn run_instruction(
    instruction: String,
    base_url: Option<String>,
    profile_path: Option<PathBuf>,
    headless: bool,
    no_llm: bool,
    fail_fast: bool,
    json: bool,
) -> anyhow::Result<bool> {
    let settings = build_settings(base_url, headless);
    let profile = load_profile(profile_path)?;
    let parser = build_parser(no_llm);

    println!("Testing against: {}\n", settings.base_url);

    let session = PlaywrightSession::launch(settings.headless, settings.browser_timeout_ms).await?;
    let page = session.new_page().await?;

    let runner = TestRunner::new(parser, profile, settings).with_stop_on_failure(fail_fast);
    let report = runner.execute_test(&page, &instruction).await;

    if let Err(e) = session.close().await {
        tracing::warn!(error = %e, "Browser shutdown failed");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(report.passed)
}

async fn parse_instruction(instruction: String, no_llm: bool, json: bool) -> anyhow::Result<bool> {
    let parser = build_parser(no_llm);
    let actions = parser.parse(&instruction).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&actions)?);
        return Ok(true);
    }

    if actions.is_empty() {
        println!("No actions could be parsed from instruction");
        return Ok(true);
    }

    println!("Parsed {} actions:\n", actions.len());
    for (i, action) in actions.iter().enumerate() {
        println!("  {}. {}", i + 1, action.label());
    }

    Ok(true)
}

async fn interactive(
    base_url: Option<String>,
    profile_path: Option<PathBuf>,
    headless: bool,
    no_llm: bool,
) -> anyhow::Result<bool> {
    let settings = build_settings(base_url, headless);
    let profile = load_profile(profile_path)?;
    let parser = build_parser(no_llm);

    println!("Testing against: {}", settings.base_url);
    println!("Enter instruction lines; a blank line runs the block, a blank block exits.\n");

    let session = PlaywrightSession::launch(settings.headless, settings.browser_timeout_ms).await?;
    let page = session.new_page().await?;
    let runner = TestRunner::new(parser, profile, settings);

    let stdin = io::stdin();
    let mut all_passed = true;
    let mut block = String::new();

    loop {
        let prompt = if block.is_empty() { "> " } else { ". " };
        print!("{prompt}");
        io::stdout().flush()?;

        let mut line = String::new();
        let bytes = stdin.lock().read_line(&mut line)?;
        let trimmed = line.trim();

        if bytes == 0 || trimmed.is_empty() {
            if block.is_empty() {
                break;
            }
            let report = runner.execute_test(&page, &block).await;
            print_report(&report);
            all_passed &= report.passed;
            block.clear();
            if bytes == 0 {
                break;
            }
            continue;
        }

        if !block.is_empty() {
            block.push('\n');
        }
        block.push_str(trimmed);
    }

    if let Err(e) = session.close().await {
        tracing::warn!(error = %e, "Browser shutdown failed");
    }

    Ok(all_passed)
}

fn print_report(report: &TestReport) {
    let banner = "=".repeat(60);
    println!("\n{banner}");
    println!("TEST RESULTS");
    println!("{banner}");
    println!("Status: {}", report.status.as_str().to_uppercase());
    println!("Duration: {} ms\n", report.duration_ms);

    for outcome in &report.actions_executed {
        let mark = match outcome.status {
            ActionStatus::Success => "✓",
            ActionStatus::Error => "✗",
        };
        match &outcome.detail {
            Some(detail) => println!("  {} {} ({})", mark, outcome.label, detail),
            None => println!("  {} {}", mark, outcome.label),
        }
    }

    if !report.screenshots.is_empty() {
        println!("\nScreenshots:");
        for path in &report.screenshots {
            println!("  {}", path.display());
        }
    }

    if !report.errors.is_empty() {
        println!("\nErrors:");
        for err in &report.errors {
            println!("  {}", err);
        }
    }
}
