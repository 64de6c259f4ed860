use std::{collections::HashSet, sync::Arc, time::Duration};

use anyhow::{anyhow, bail, Result};
use clap::{ArgGroup, Args, Parser, Subcommand};
use client_core::{
    Catalog, ChatScreen, ClientConfig, DeleteOutcome, DocsBackend, GuestRequestForm,
    GuestRequestInput, GuestRequestJudgeScreen, GuestRequestListScreen, HttpBackend, JudgeState,
    ScreenContext, Submission, DEFAULT_POLL_INTERVAL,
};
use shared::{
    domain::{ChatMessageId, GuestRequestId},
    protocol::GuestRequestSortColumn,
};
use tracing::info;

mod console;

use console::{format_message, ConsoleDialogs, ConsoleNavigator};

#[derive(Parser, Debug)]
#[command(name = "portal", about = "Document portal chat and guest requests")]
struct Cli {
    #[arg(long, env = "PORTAL_SERVER_URL", default_value = client_core::config::DEFAULT_SERVER_URL)]
    server_url: String,
    /// Session token from `portal login`.
    #[arg(long, env = "PORTAL_TOKEN")]
    token: Option<String>,
    /// Answer confirmation prompts with their default button.
    #[arg(long, short = 'y')]
    yes: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a session token for later commands.
    Login {
        username: String,
        #[arg(long, env = "PORTAL_PASSWORD")]
        password: String,
    },
    #[command(subcommand)]
    Chat(ChatCommand),
    /// Ask for a guest account.
    RequestGuest(GuestRequestArgs),
    /// List guest requests (admin).
    GuestRequests {
        /// 0 id, 1 username, 2 email, 3 create date, 4 deleted, 5 approved.
        #[arg(long, default_value_t = 1)]
        sort_column: u8,
        #[arg(long)]
        desc: bool,
    },
    /// Approve or reject a guest request (admin).
    #[command(group(ArgGroup::new("decision").required(true).args(["approve", "reject"])))]
    Judge {
        id: GuestRequestId,
        #[arg(long)]
        approve: bool,
        #[arg(long)]
        reject: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ChatCommand {
    /// Follow the chat until interrupted.
    Watch {
        #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL.as_millis() as u64)]
        interval_ms: u64,
    },
    Say {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    Delete {
        id: ChatMessageId,
    },
}

#[derive(Args, Debug)]
struct GuestRequestArgs {
    #[arg(long)]
    username: String,
    #[arg(long, env = "PORTAL_PASSWORD")]
    password: String,
    #[arg(long)]
    email: String,
    /// Requested storage in megabytes.
    #[arg(long, default_value_t = 0)]
    quota_mb: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();
    let cli = Cli::parse();

    let mut config = ClientConfig::new(&cli.server_url);
    config.token = cli.token.clone();
    let backend = Arc::new(HttpBackend::new(&config)?);
    let navigator = Arc::new(ConsoleNavigator::default());
    let ctx = ScreenContext {
        backend: backend.clone(),
        dialogs: Arc::new(ConsoleDialogs {
            assume_yes: cli.yes,
        }),
        translate: Arc::new(Catalog::english()),
        navigator: navigator.clone(),
    };

    match cli.command {
        Command::Login { username, password } => {
            let session = backend.login(&username, &password).await?;
            println!("{}", session.token);
        }
        Command::Chat(command) => run_chat(ctx, command).await?,
        Command::RequestGuest(args) => {
            let mut form = GuestRequestForm::new(ctx);
            form.input = GuestRequestInput {
                username: args.username,
                password: args.password,
                email: args.email,
                storage_quota_mb: args.quota_mb,
            };
            match form.submit().await {
                Submission::Sent => {}
                Submission::Skipped => bail!("username, password and email are required"),
                Submission::Failed => bail!("guest request was not accepted"),
            }
        }
        Command::GuestRequests { sort_column, desc } => {
            let column = GuestRequestSortColumn::from_index(sort_column)
                .ok_or_else(|| anyhow!("unknown sort column {sort_column}"))?;
            let mut screen = GuestRequestListScreen::open(ctx).await;
            if column != GuestRequestSortColumn::default() || desc {
                screen.sort_by(column, !desc).await;
            }
            if let Some(error) = screen.error() {
                bail!("could not load guest requests: {error}");
            }
            for request in screen.requests() {
                println!(
                    "{}  {:<20} {:<30} {:>8} MB  {:?}",
                    request.id,
                    request.username,
                    request.email,
                    request.storage_quota / shared::domain::BYTES_PER_MEGABYTE,
                    request.approved
                );
            }
        }
        Command::Judge { id, approve, .. } => {
            let mut screen = GuestRequestJudgeScreen::open(ctx, id).await;
            if let Some(request) = screen.request() {
                println!("{} <{}>", request.username, request.email);
            }
            match screen.judge(approve).await {
                JudgeState::JudgedSuccess | JudgeState::JudgedNotFound => {}
                JudgeState::JudgeFailed { message } => bail!("{message}"),
                other => bail!("judge did not complete: {other:?}"),
            }
        }
    }

    if navigator.reload_requested() {
        info!("server state changed");
    }
    Ok(())
}

async fn run_chat(ctx: ScreenContext, command: ChatCommand) -> Result<()> {
    match command {
        ChatCommand::Watch { interval_ms } => {
            let interval = Duration::from_millis(interval_ms.max(1));
            let mut screen = ChatScreen::open(ctx, interval).await;
            let mut printed = HashSet::new();
            let mut render = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = render.tick() => {
                        let view = screen.view().await;
                        if let Some(error) = &view.load_error {
                            eprintln!("load failed: {error}");
                        }
                        for message in &view.messages {
                            if printed.insert(message.id) {
                                println!("{}", format_message(message));
                            }
                        }
                    }
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
            screen.close();
        }
        ChatCommand::Say { text } => {
            let mut screen = ChatScreen::open(ctx, DEFAULT_POLL_INTERVAL).await;
            screen.set_input(text.join(" ")).await;
            let outcome = screen.send_message().await;
            let view = screen.view().await;
            screen.close();
            match outcome {
                Submission::Sent => {
                    if let Some(last) = view.messages.last() {
                        println!("{}", format_message(last));
                    }
                }
                Submission::Skipped => bail!("nothing to send"),
                Submission::Failed => bail!(
                    "{}",
                    view.action_error.unwrap_or_else(|| "send failed".into())
                ),
            }
        }
        ChatCommand::Delete { id } => {
            let mut screen = ChatScreen::open(ctx, DEFAULT_POLL_INTERVAL).await;
            let view = screen.view().await;
            let Some(message) = view.messages.iter().find(|m| m.id == id) else {
                screen.close();
                bail!("no chat message {id}");
            };
            let outcome = screen.delete_message(message).await;
            let view = screen.view().await;
            screen.close();
            match outcome {
                DeleteOutcome::Deleted => println!("deleted {id}"),
                DeleteOutcome::Cancelled => println!("kept {id}"),
                DeleteOutcome::Failed => bail!(
                    "{}",
                    view.action_error.unwrap_or_else(|| "delete failed".into())
                ),
            }
        }
    }
    Ok(())
}
