//! Selección de los eventos de `notify` que merecen una limpieza.

use std::path::PathBuf;

use notify::event::{AccessKind, AccessMode, CreateKind, ModifyKind, RenameMode};
use notify::{Event, EventKind};

use crate::config::Config;

/// Rutas del evento que corresponden a imágenes creadas o terminadas de escribir.
///
/// Los cambios de solo metadata (como restaurar la fecha de modificación), los
/// borrados y los eventos de carpetas se descartan.
pub fn accepted_paths(event: &Event, config: &Config) -> Vec<PathBuf> {
    relevant_paths(event)
        .iter()
        .filter(|path| config.watches(path))
        .cloned()
        .collect()
}

fn relevant_paths(event: &Event) -> &[PathBuf] {
    match event.kind {
        EventKind::Create(CreateKind::Folder) => &[],
        EventKind::Create(_) => &event.paths,
        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any) => {
            &event.paths
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => &event.paths,
        // Origen y destino; solo interesa a dónde llegó el archivo.
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            event.paths.get(1..).unwrap_or(&[])
        }
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => &event.paths,
        _ => &[],
    }
}
