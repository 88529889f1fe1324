use anyhow::Result;
use clap::Parser;
use colored::*;

mod api_client;
mod output;
mod scenarios;
mod sse_client;

use api_client::ApiClient;
use output::print_test_summary;
use sse_client::Connection;

#[derive(Parser)]
#[command(name = "sse-test-client")]
#[command(about = "Fact stream integration testing tool")]
struct Cli {
    /// Base URL of the running server (e.g., http://localhost:4000)
    #[arg(long)]
    base_url: String,

    /// Test scenario to run
    #[arg(long, value_enum)]
    scenario: ScenarioChoice,

    /// Enable verbose output
    #[arg(long, short)]
    verbose: bool,
}

#[derive(clap::ValueEnum, Clone)]
enum ScenarioChoice {
    /// Open two streams and expect a snapshot on each
    ConnectionTest,
    /// Publish one fact and expect it on both streams
    Broadcast,
    /// Check subscriber count and last sequence
    Status,
    /// Open a late stream and expect the last fact in its snapshot
    Replay,
    /// Publish a null fact and expect a 422
    InvalidPayload,
    /// Run every scenario in order
    All,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    }

    println!("{}", "=== SETUP PHASE ===".bright_white().bold());

    let client = reqwest::Client::new();
    let api_client = ApiClient::new(client, cli.base_url.clone());

    println!("{} Establishing SSE connections...", "→".blue());
    let mut sse1 = Connection::establish(&cli.base_url, "Subscriber 1".to_string()).await?;
    let mut sse2 = Connection::establish(&cli.base_url, "Subscriber 2".to_string()).await?;

    println!("{} Subscriber 1 SSE connection established", "✓".green());
    println!("{} Subscriber 2 SSE connection established", "✓".green());

    println!("\n{}", "=== TEST PHASE ===".bright_white().bold());

    let mut results = Vec::new();

    // Every scenario after the first expects the snapshot to have been consumed
    results.push(scenarios::test_connection(&mut sse1, &mut sse2).await?);

    match cli.scenario {
        ScenarioChoice::ConnectionTest => {}
        ScenarioChoice::Broadcast => {
            results.push(scenarios::test_broadcast(&api_client, &mut sse1, &mut sse2).await?);
        }
        ScenarioChoice::Status => {
            results.push(scenarios::test_status(&api_client).await?);
        }
        ScenarioChoice::Replay => {
            results.push(scenarios::test_replay(&api_client, &cli.base_url).await?);
        }
        ScenarioChoice::InvalidPayload => {
            results.push(scenarios::test_invalid_payload(&api_client).await?);
        }
        ScenarioChoice::All => {
            results.push(scenarios::test_broadcast(&api_client, &mut sse1, &mut sse2).await?);
            results.push(scenarios::test_status(&api_client).await?);
            results.push(scenarios::test_replay(&api_client, &cli.base_url).await?);
            results.push(scenarios::test_invalid_payload(&api_client).await?);
        }
    }

    println!("\n{}", "=== RESULTS ===".bright_white().bold());
    print_test_summary(&results);

    let all_passed = results.iter().all(|r| r.passed);

    if all_passed {
        println!("\n{}", "All tests passed! ✓".bright_green().bold());
    } else {
        println!("\n{}", "Some tests failed! ✗".bright_red().bold());
    }

    std::process::exit(if all_passed { 0 } else { 1 });
}
