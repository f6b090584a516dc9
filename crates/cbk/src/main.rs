use std::{process::ExitCode, sync::Arc};

use cbk_core::config::Config;
use cbk_discord::DiscordClient;

mod commands;

use commands::App;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = cbk_core::logging::init("cbk") {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    let line = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if line.trim().is_empty() {
        eprintln!("{}", commands::usage());
        return ExitCode::from(2);
    }

    match run(&line).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(line: &str) -> anyhow::Result<()> {
    let cfg = Config::load()?;
    let client = DiscordClient::from_config(&cfg)?;

    let me = client.current_user().await?;
    tracing::info!("Logged in as {} ({})", me.username, me.id);

    commands::dispatch(Arc::new(App { cfg, client }), line).await
}
