use console::style;
use tracing::info;

use crate::cli::Cli;
use crate::config::Config;
use crate::error::Result;
use crate::report::Reporter;
use crate::sanitizer::Sanitizer;
use crate::signals::ShutdownSignal;
use crate::watcher::{self, DirectoryWatcher};

/// Carga la configuración, prepara la vigilancia y procesa eventos hasta
/// recibir SIGINT o SIGTERM.
///
/// Solo devuelve error si algo falla antes de empezar a vigilar.
pub fn run(cli: &Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply_to(&mut config);
    let config = config.normalized()?;

    let sanitizer = Sanitizer::new(&config);
    let reporter = Reporter::new(cli.quiet);
    let mut directory = DirectoryWatcher::new(&cli.root, &config)?;
    let shutdown = ShutdownSignal::install();

    if !reporter.is_quiet() {
        println!(
            "{} {}",
            style("Vigilando carpeta:").cyan().bold(),
            directory.root().display()
        );
        println!("{}\n", style("Presiona Ctrl+C para detener...").dim());
    }

    if config.scan_existing {
        directory.scan_existing(&shutdown, |event| {
            watcher::handle_event(&sanitizer, &reporter, event)
        });
    }

    directory.run(&shutdown, |event| {
        watcher::handle_event(&sanitizer, &reporter, event)
    });

    info!(root = %directory.root().display(), "Vigilancia detenida");
    if !reporter.is_quiet() {
        println!("\n{}", style("Vigilancia detenida.").dim());
    }
    Ok(())
}
