//! Collision ETL CLI
//!
//! Runs the raw -> standardized -> aggregate pipeline once and exits.

use clap::Parser;
use collision_etl::cli::{init_tracing, Cli, Runner};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let status = Runner::new(cli).execute().await;
    std::process::exit(status.code());
}
