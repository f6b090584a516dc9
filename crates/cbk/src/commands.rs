use std::{future::Future, pin::Pin, sync::Arc};

use anyhow::{bail, Context};

use cbk_core::{
    config::Config,
    domain::{Requester, UserId},
    migration::{
        progress::{ProgressPhase, ProgressTracker},
        run_migration, MigrationRequest, Ports,
    },
};
use cbk_discord::{progress::EmbedProgressReporter, DiscordClient};

pub struct App {
    pub cfg: Config,
    pub client: DiscordClient,
}

type HandlerFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;
type Handler = fn(Arc<App>, Vec<String>) -> HandlerFuture;

pub struct Command {
    pub name: &'static str,
    pub usage: &'static str,
    pub description: &'static str,
    handler: Handler,
}

pub static COMMANDS: &[Command] = &[
    Command {
        name: "backup",
        usage: "backup <source-channel> <destination-server> <destination-channel>",
        description: "Copy every message of a channel into a channel of another server",
        handler: backup,
    },
    Command {
        name: "help",
        usage: "help",
        description: "Show available commands",
        handler: help,
    },
];

/// Split `"/cmd@bot arg1 ..."` into a lower-cased command name and its arguments.
pub fn parse_command(text: &str) -> (String, Vec<String>) {
    let mut parts = text.split_whitespace();
    let cmd = parts
        .next()
        .unwrap_or("")
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();
    (cmd, parts.map(str::to_string).collect())
}

pub fn find(name: &str) -> Option<&'static Command> {
    COMMANDS.iter().find(|c| c.name == name)
}

pub fn usage() -> String {
    let mut out = String::from("Commands:\n");
    for cmd in COMMANDS {
        out.push_str(&format!("  {:<72} {}\n", cmd.usage, cmd.description));
    }
    out
}

pub async fn dispatch(app: Arc<App>, line: &str) -> anyhow::Result<()> {
    let (name, args) = parse_command(line);
    let Some(cmd) = find(&name) else {
        bail!("unknown command: {name:?}\n\n{}", usage());
    };
    (cmd.handler)(app, args).await
}

fn backup(app: Arc<App>, args: Vec<String>) -> HandlerFuture {
    Box::pin(handle_backup(app, args))
}

fn help(_app: Arc<App>, _args: Vec<String>) -> HandlerFuture {
    Box::pin(async {
        println!("{}", usage());
        Ok(())
    })
}

fn requester(cfg: &Config) -> Requester {
    match cfg.owner_id {
        Some(id) => Requester {
            id: Some(UserId(id)),
            name: id.to_string(),
        },
        None => Requester {
            id: None,
            name: "cli".to_string(),
        },
    }
}

async fn handle_backup(app: Arc<App>, args: Vec<String>) -> anyhow::Result<()> {
    let [source, server, destination] = args.as_slice() else {
        bail!("usage: {}", COMMANDS[0].usage);
    };

    let request = MigrationRequest {
        source_channel: source.clone(),
        destination_server: server.clone(),
        destination_channel: destination.clone(),
        requester: requester(&app.cfg),
    };

    let mut tracker = ProgressTracker::new();
    if let Some(channel) = app.cfg.report_channel {
        tracker = tracker.with_sink(Arc::new(EmbedProgressReporter::new(
            app.client.clone(),
            channel,
            request.requester.clone(),
        )));
    }

    let mut updates = tracker.subscribe();
    let watcher = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            match (snapshot.phase, snapshot.total) {
                (ProgressPhase::Replaying, Some(total)) => tracing::info!(
                    "{} {}/{total} ({}%)",
                    snapshot.status,
                    snapshot.current,
                    snapshot.percentage()
                ),
                _ => tracing::info!("{}", snapshot.status),
            }
        }
    });

    let ports = Ports {
        resolver: &app.client,
        history: &app.client,
        sink: &app.client,
    };
    let outcome = run_migration(request, ports, &app.cfg.migration, &tracker).await;
    drop(tracker);
    let _ = watcher.await;

    let result = outcome.context("backup aborted")?;
    println!(
        "Backup {}: {} sent, {} failed, {} total",
        result.status_label(),
        result.success_count,
        result.fail_count,
        result.total_messages
    );
    Ok(())
}
