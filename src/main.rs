use std::io;

use anyhow::{Context, Result};
use clap::Parser;

use deepl_http::cli::{commands, init_logging, Args};
use deepl_http::{Cancellation, ClientOptions, DeeplError, Translator};

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let auth_key = args
        .auth_key
        .as_deref()
        .filter(|key| !key.trim().is_empty())
        .context("missing auth key: pass --auth-key or set DEEPL_AUTH_KEY")?;

    let (cancel, cancellation) = Cancellation::new();
    let translator = Translator::new(auth_key)?
        .with_options(ClientOptions {
            timeout_ms: args.timeout_ms,
            server_url: args.server_url.clone(),
            ..ClientOptions::default()
        })
        .with_cancellation(cancellation);
    tracing::debug!(server_url = translator.server_url(), "translator ready");

    let mut out = io::stdout();
    tokio::select! {
        result = commands::run(&translator, args.command, args.verbose, &mut out) => result,
        interrupted = tokio::signal::ctrl_c() => {
            interrupted.context("could not listen for Ctrl-C")?;
            cancel.cancel();
            Err(DeeplError::Cancelled.into())
        }
    }
}
