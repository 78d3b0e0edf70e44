use clap::Parser;
use std::net::SocketAddr;

use trove_fake::FakeConfig;

#[derive(Parser, Debug)]
#[command(name = "trove-fake", about = "In-memory database service for running the scenarios locally")]
struct Args {
    #[arg(long, env = "FAKE_TROVE_LISTEN", default_value = "127.0.0.1:8779")]
    listen: SocketAddr,

    #[arg(long, env = "FAKE_TROVE_TOKEN", default_value = "fake-token")]
    token: String,

    #[arg(long, env = "FAKE_TROVE_USERNAME", default_value = "demo")]
    username: String,

    #[arg(long, env = "FAKE_TROVE_PASSWORD", default_value = "secret")]
    password: String,

    #[arg(long, env = "FAKE_TROVE_PROJECT", default_value = "demo")]
    project_name: String,

    /// Status reads before a resource moves to its next status.
    #[arg(long, env = "FAKE_TROVE_SETTLE_POLLS", default_value_t = 2)]
    settle_polls: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let config = FakeConfig {
        token: args.token,
        username: args.username,
        password: args.password,
        project_name: args.project_name,
        settle_polls: args.settle_polls,
        ..FakeConfig::default()
    };
    let fake = trove_fake::bind(config, args.listen).await?;
    println!("TROVE_ENDPOINT={}", fake.base_url);
    println!("TROVE_AUTH_TOKEN={}", fake.token);
    println!("OS_AUTH_URL={}", fake.auth_url);

    tokio::signal::ctrl_c().await?;
    tracing::info!("[fake] shutting down");
    Ok(())
}
