mod args;
mod classroom;

use clap::Parser;
use log::{info, warn};
use snafu::ErrorCompat;

use crate::args::{Args, Command};
use crate::classroom::ClassroomResult;

fn run(args: &Args) -> ClassroomResult<()> {
    match &args.command {
        Command::Serve(serve_args) => classroom::run_server(serve_args),
        Command::Rank(rank_args) => classroom::run_rank(rank_args),
    }
}

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
    info!("args: {:?}", args);

    if let Err(e) = run(&args) {
        warn!("Error occured {:?}", e);
        eprintln!("An error occured {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
