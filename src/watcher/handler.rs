//! Frontera entre el vigilante y el sanitizador.

use std::path::Path;
use std::time::SystemTime;

use tracing::{error, info, info_span, warn};
use walkdir::WalkDir;

use super::WatchEvent;
use crate::config::Config;
use crate::report::Reporter;
use crate::sanitizer::{Sanitizer, TEMP_PREFIX};
use crate::signals::ShutdownSignal;

/// Limpia el archivo del evento e imprime el resultado.
///
/// Los errores se registran con la ruta y se descartan: un archivo roto no
/// detiene la vigilancia.
pub fn handle_event(sanitizer: &Sanitizer, reporter: &Reporter, event: &WatchEvent) {
    let span = info_span!("clean", path = %event.path.display());
    let _guard = span.enter();

    match sanitizer.clean(&event.path) {
        Ok(report) => {
            info!(
                format = report.format.name(),
                removed = report.removed.len(),
                sensitive = report.removed_sensitive(),
                retained = report.retained.len(),
                written = report.written,
                coalesced = event.coalesced,
                "Imagen procesada"
            );
            reporter.print(&report);
        }
        Err(err) => {
            error!(kind = err.kind(), error = %err, "No se pudo limpiar la imagen");
            reporter.print_failure(&event.path, &err);
        }
    }
}

/// Recorre `root` y pasa cada imagen existente por `handler`.
///
/// Devuelve cuántos archivos se despacharon.
pub fn scan_existing<F>(root: &Path, config: &Config, shutdown: &ShutdownSignal, mut handler: F) -> usize
where
    F: FnMut(&WatchEvent),
{
    let mut dispatched = 0;

    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        if shutdown.is_requested() {
            break;
        }

        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "No se pudo leer una entrada durante el barrido inicial");
                continue;
            }
        };

        if !entry.file_type().is_file() || !config.watches(entry.path()) {
            continue;
        }
        if entry.file_name().to_string_lossy().starts_with(TEMP_PREFIX) {
            continue;
        }

        let first_seen = entry
            .metadata()
            .ok()
            .and_then(|meta| meta.modified().ok())
            .unwrap_or_else(SystemTime::now);

        handler(&WatchEvent {
            path: entry.into_path(),
            first_seen,
            coalesced: 1,
        });
        dispatched += 1;
    }

    info!(root = %root.display(), files = dispatched, "Barrido inicial completado");
    dispatched
}
