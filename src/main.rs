use clap::Parser;
use sandbox_editor::{SResult, cli::Cli, init_logger, init_logger_with_path, run};

#[snafu::report]
fn main() -> SResult<()> {
    let cli = Cli::parse();

    match &cli.log_file {
        Some(path) => init_logger_with_path(path)?,
        None => init_logger(),
    }

    run(cli)
}
