use clap::Parser;
use geocodage::{Cli, Config, trace_init};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    trace_init();
    let config = Config::from_env(cli.data_dir.clone());
    cli.run(&config)?;
    Ok(())
}
