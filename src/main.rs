#![allow(missing_docs)]

use std::process::ExitCode;

use clap::Parser;

use catalog_watch_lib::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    match catalog_watch_lib::run(Cli::parse()).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ {e:#}");
            ExitCode::FAILURE
        }
    }
}
