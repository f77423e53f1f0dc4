use clap::Parser;
use equiscore::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
