use agenda_medica::config::FormatConfig;
use agenda_medica::{logger, Agenda, AgendaConfig, CliArgs, Console, JsonFileStore, MemoryStore, Store};
use anyhow::Context;
use clap::Parser;
use std::io;

fn run_console<S: Store>(store: S, config: &AgendaConfig) -> anyhow::Result<()> {
    let hours = config.operating_hours()?;
    let agenda = Agenda::with_clock(store, agenda_medica::SystemClock, hours);
    let formats: FormatConfig = config.formats.clone();

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut console = Console::new(agenda, formats, stdin.lock(), stdout.lock());
    console.run().context("console I/O failed")?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    logger::init_cli_logger(args.verbose);

    let config = AgendaConfig::load(&args).context("invalid configuration")?;
    tracing::debug!("Configuration: {:?}", config);

    match &config.storage.path {
        Some(path) => {
            let store = JsonFileStore::open(path)
                .with_context(|| format!("cannot open agenda file {}", path.display()))?;
            tracing::info!("Using agenda file {}", path.display());
            run_console(store, &config)
        }
        None => {
            tracing::info!("Using in-memory agenda; nothing will be saved");
            run_console(MemoryStore::new(), &config)
        }
    }
}
