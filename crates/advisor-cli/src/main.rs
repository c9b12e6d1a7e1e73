//! advisor-cli: ask the prediction service for a BUY/HOLD/SELL call.
//!
//! Usage:
//!   cargo run -p advisor-cli -- AAPL MSFT        # one query per ticker, in order
//!   cargo run -p advisor-cli                     # one query per stdin line
//!   PREDICTION_SOURCE=simulated cargo run -p advisor-cli -- NVDA
//!
//! In stdin mode a new line supersedes any query still in flight; only the
//! latest answer is shown.

use std::rc::Rc;

use anyhow::Result;
use prediction_client::{build_source, ClientConfig};
use query_controller::{RequestController, SubmitOutcome};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::LocalSet;

mod render;

const USAGE: &str = "Usage: advisor-cli [TICKER ...]\n\
\n\
With tickers, each one is queried in turn. Without, tickers are read from stdin.\n\
\n\
Environment:\n  \
  API_BASE_URL       base URL of the prediction service\n  \
  PREDICTION_SOURCE  http (default), generative or simulated\n  \
  GEMINI_API_KEY     required for the generative source\n  \
  GEMINI_MODEL       generative model name\n  \
  SIMULATION_SEED    fixed seed for the simulated source";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("{USAGE}");
        return Ok(());
    }

    let config = ClientConfig::from_env()?;
    let source = build_source(&config)?;
    let controller = Rc::new(RequestController::new(source));

    if args.is_empty() {
        LocalSet::new().run_until(run_interactive(controller)).await
    } else {
        run_batch(&controller, &args).await;
        Ok(())
    }
}

fn init_tracing() {
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "advisor_cli=info,query_controller=info,prediction_client=info".into()
        })
    };

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter())
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(std::io::stderr)
            .init();
    }
}

async fn run_batch(controller: &RequestController, tickers: &[String]) {
    for ticker in tickers {
        if controller.submit_query(ticker).await == SubmitOutcome::Ignored {
            continue;
        }
        println!("{}\n", render::render(&controller.snapshot()));
    }
}

/// Reads tickers from stdin until EOF or Ctrl-C, redrawing on every state change.
async fn run_interactive(controller: Rc<RequestController>) -> Result<()> {
    let mut observer = controller.subscribe();
    println!("{}", render::render(&observer.borrow_and_update()));

    let printer = tokio::task::spawn_local(async move {
        while observer.changed().await.is_ok() {
            let state = observer.borrow_and_update().clone();
            tracing::debug!(state = state.label(), "State changed");
            println!("{}\n", render::render(&state));
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut in_flight = Vec::new();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let controller = Rc::clone(&controller);
                in_flight.retain(|handle: &tokio::task::JoinHandle<SubmitOutcome>| !handle.is_finished());
                in_flight.push(tokio::task::spawn_local(async move {
                    controller.submit_query(&line).await
                }));
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, exiting");
                return Ok(());
            }
        }
    }

    for handle in in_flight {
        handle.await?;
    }

    // Dropping the last controller closes the channel and ends the printer.
    drop(controller);
    printer.await?;
    Ok(())
}
