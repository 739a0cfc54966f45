use clap::Parser;
use motscore_server::cli::{self, Cli};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    utils::init_logger(cli.verbose);
    cli::run(cli, &mut std::io::stdout())
}
