use std::io::BufRead;

use clap::Parser;
use eyre::WrapErr;
use session::Session;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

mod console;
mod help;

#[derive(Debug, Parser)]
#[clap(version, about)]
struct Args {
    #[clap(flatten)]
    config: config::Args,

    /// Print engine messages as JSON
    #[clap(long)]
    json: bool,

    /// Write logs as JSON
    #[clap(long)]
    log_json: bool,
}

/// Filter used when `RUST_LOG` is not set. Raw traffic is logged at info,
/// so it only shows up in verbose mode.
fn default_filter(verbose: bool) -> &'static str {
    if verbose { "info" } else { "warn" }
}

fn init_logging(verbose: bool, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        let _ = builder.json().try_init();
    } else {
        let _ = builder.try_init();
    }
}

/// Feed stdin lines to the console from a plain thread, so a pending read
/// never holds up runtime shutdown.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(1);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!(error = %e, "reading stdin");
                    break;
                }
            };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install().context("installing color_eyre")?;

    let args = Args::parse();
    let config = config::Config::load(&args.config).context("loading configuration")?;
    init_logging(config.verbose, args.log_json);
    tracing::debug!(?config, "starting footle");

    let shutdown = CancellationToken::new();
    let (messages_tx, messages_rx) = mpsc::channel(1);
    let session = Session::start(config, vec![messages_tx], &shutdown);

    session
        .handle()
        .submit("on")
        .await
        .context("waking up the session")?;

    let printer = tokio::spawn(console::print_messages(messages_rx, args.json));
    let console = console::Console::new(session.handle(), session.verbosity().clone());
    let reader = tokio::spawn(console.run(spawn_stdin_reader(), shutdown.clone()));

    tokio::select! {
        _ = shutdown.cancelled() => {}
        interrupted = tokio::signal::ctrl_c() => {
            interrupted.context("waiting for ctrl-c")?;
            tracing::info!("interrupted");
            shutdown.cancel();
        }
    }

    session.shutdown().await;
    reader.abort();
    printer.abort();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_unless_verbose() {
        assert_eq!(default_filter(false), "warn");
        assert_eq!(default_filter(true), "info");
    }

    #[test]
    fn flags_parse() {
        let args = Args::try_parse_from(["footle", "--port-dbgp", "9000", "-vvv", "--json"]).unwrap();

        assert_eq!(args.config.port_dbgp, Some(9000));
        assert_eq!(args.config.verbose, 3);
        assert!(args.json);
        assert!(!args.log_json);
    }
}
