use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use server_api::create_user;
use shared::{domain::Role, protocol::GuestRequestSortColumn};
use storage::Storage;
use tracing::info;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://./data/portal.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RoleArg {
    Admin,
    User,
}

impl From<RoleArg> for Role {
    fn from(value: RoleArg) -> Self {
        match value {
            RoleArg::Admin => Role::Admin,
            RoleArg::User => Role::User,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    CreateUser {
        username: String,
        email: String,
        #[arg(long, env = "PORTAL_PASSWORD")]
        password: String,
        #[arg(long, value_enum, default_value = "user")]
        role: RoleArg,
    },
    /// Dump every guest request, judged ones included.
    ListGuestRequests,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;

    match cli.command {
        Command::CreateUser {
            username,
            email,
            password,
            role,
        } => {
            let user_id = create_user(&storage, &username, &email, &password, role.into())
                .await
                .map_err(|e| anyhow!("{}: {}", e.code, e.message))?;
            info!(%user_id, %username, "user created");
            println!("created user_id={user_id}");
        }
        Command::ListGuestRequests => {
            let requests = storage
                .list_guest_requests(GuestRequestSortColumn::CreateDate, true)
                .await?;
            for request in requests {
                println!(
                    "{} {} <{}> quota={} approval={:?} deleted={}",
                    request.request_id,
                    request.username,
                    request.email,
                    request.storage_quota,
                    request.approval,
                    request.deleted
                );
            }
        }
    }

    Ok(())
}
