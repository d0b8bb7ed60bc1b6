use clap::Parser;
use ping_harness::{init_tracing, run, Cli};

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let report = run(&cli)?;
    println!("{report}");
    Ok(())
}
