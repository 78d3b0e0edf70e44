use anyhow::Context;
use clap::Parser;
use std::process::ExitCode;

use trove_common::Settings;
use trove_tempest::{all_suites, harness, Attr, Selection};

#[derive(Parser, Debug)]
#[command(name = "trove-tempest", about = "Run the database service conformance scenarios")]
struct Args {
    /// List the selected cases instead of running them.
    #[arg(long)]
    list: bool,

    /// Only run cases whose `Suite.case` name or idempotent id contains this.
    #[arg(long)]
    filter: Option<String>,

    /// Only run cases tagged with this attribute (smoke, slow).
    #[arg(long)]
    attr: Option<Attr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt::init();
    dotenv::dotenv().ok();

    let args = Args::parse();
    let suites = all_suites();
    let selection = Selection {
        filter: args.filter,
        attr: args.attr,
    };

    if args.list {
        for line in harness::describe(&suites, &selection) {
            println!("{}", line);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let settings = Settings::from_env().context("invalid configuration")?;
    let report = harness::run(&suites, &settings, &selection).await;
    println!("{}", report);

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
