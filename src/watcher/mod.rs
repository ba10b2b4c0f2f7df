//! Vigilancia recursiva de una carpeta y despacho de las imágenes asentadas.
//!
//! `notify` empuja los eventos crudos a un canal desde su propio hilo. El
//! bucle de [`DirectoryWatcher::run`] los filtra, los agrupa por ruta y llama
//! al manejador una vez por archivo, de uno en uno.

mod debounce;
mod echo;
mod filter;
mod handler;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::signals::ShutdownSignal;

pub use debounce::Debouncer;
pub use echo::{FileStamp, SelfWrites};
pub use filter::accepted_paths;
pub use handler::{handle_event, scan_existing};

/// Cada cuánto se revisa la bandera de parada mientras no llegan eventos.
const SHUTDOWN_POLL: Duration = Duration::from_millis(200);

/// Margen, además del periodo de calma, para que llegue el eco de una escritura.
const ECHO_GRACE: Duration = Duration::from_secs(10);

/// Archivo listo para limpiar tras su periodo de calma.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WatchEvent {
    pub path: PathBuf,
    /// Momento del primer evento de la ráfaga.
    pub first_seen: SystemTime,
    /// Eventos crudos agrupados en este.
    pub coalesced: usize,
}

pub struct DirectoryWatcher {
    root: PathBuf,
    config: Config,
    rx: Receiver<notify::Result<Event>>,
    self_writes: SelfWrites,
    _watcher: RecommendedWatcher,
}

impl DirectoryWatcher {
    /// Empieza a vigilar `root` de forma recursiva.
    ///
    /// Falla con [`Error::WatchSetup`] si la ruta no existe, no es una carpeta
    /// o el sistema no permite vigilarla.
    pub fn new(root: &Path, config: &Config) -> Result<Self> {
        let metadata = fs::metadata(root)
            .map_err(|e| Error::watch_setup(root, format!("La ruta no es accesible: {}", e)))?;
        if !metadata.is_dir() {
            return Err(Error::watch_setup(root, "La ruta no es una carpeta"));
        }
        let root = fs::canonicalize(root).map_err(|e| Error::watch_setup(root, e))?;

        let (tx, rx) = crossbeam_channel::unbounded();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.send(res);
        })
        .map_err(|e| Error::watch_setup(&root, e))?;
        watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(|e| Error::watch_setup(&root, e))?;

        info!(root = %root.display(), debounce_ms = config.debounce_ms, "Vigilancia iniciada");

        Ok(Self {
            root,
            config: config.clone(),
            rx,
            self_writes: self_writes_for(config),
            _watcher: watcher,
        })
    }

    /// Carpeta vigilada, ya canonicalizada.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Pasa por `handler` las imágenes que ya estaban en la carpeta.
    ///
    /// Comparte con [`DirectoryWatcher::run`] la memoria de escrituras
    /// propias, así que lo limpiado aquí no se vuelve a procesar después.
    pub fn scan_existing<F>(&mut self, shutdown: &ShutdownSignal, mut handler: F) -> usize
    where
        F: FnMut(&WatchEvent),
    {
        let self_writes = &mut self.self_writes;
        scan_existing(&self.root, &self.config, shutdown, |event| {
            dispatch(event, &mut handler, self_writes)
        })
    }

    /// Procesa eventos hasta que se pida la parada.
    pub fn run<F>(&mut self, shutdown: &ShutdownSignal, handler: F)
    where
        F: FnMut(&WatchEvent),
    {
        pump(&self.rx, &self.config, shutdown, &mut self.self_writes, handler);
    }
}

pub(crate) fn self_writes_for(config: &Config) -> SelfWrites {
    SelfWrites::new(config.debounce() + ECHO_GRACE)
}

/// Bucle de eventos separado del vigilante real para poder alimentarlo a mano.
pub(crate) fn pump<F>(
    rx: &Receiver<notify::Result<Event>>,
    config: &Config,
    shutdown: &ShutdownSignal,
    self_writes: &mut SelfWrites,
    mut handler: F,
) where
    F: FnMut(&WatchEvent),
{
    let mut debouncer = Debouncer::new(config.debounce());

    loop {
        if shutdown.is_requested() {
            debug!(pending = debouncer.len(), "Parada solicitada");
            return;
        }

        let timeout = debouncer
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
            .map_or(SHUTDOWN_POLL, |wait| wait.min(SHUTDOWN_POLL));

        match rx.recv_timeout(timeout) {
            Ok(Ok(event)) => {
                let now = Instant::now();
                for path in accepted_paths(&event, config) {
                    debug!(path = %path.display(), kind = ?event.kind, "Evento registrado");
                    debouncer.record(path, now);
                }
            }
            Ok(Err(err)) => warn!(error = %err, "El vigilante informó un error"),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                debug!(pending = debouncer.len(), "Canal de eventos cerrado");
                for event in debouncer.drain_all() {
                    dispatch(&event, &mut handler, self_writes);
                }
                return;
            }
        }

        for event in debouncer.take_settled(Instant::now()) {
            if shutdown.is_requested() {
                return;
            }
            dispatch(&event, &mut handler, self_writes);
        }

        if !self_writes.is_empty() {
            self_writes.prune(Instant::now());
        }
    }
}

fn dispatch<F>(event: &WatchEvent, handler: &mut F, self_writes: &mut SelfWrites)
where
    F: FnMut(&WatchEvent),
{
    // El archivo pudo borrarse o moverse durante la espera.
    let Some(before) = FileStamp::read(&event.path) else {
        debug!(path = %event.path.display(), "El archivo ya no existe; se omite");
        return;
    };
    if self_writes.is_echo(&event.path, before) {
        debug!(path = %event.path.display(), "Evento de nuestra propia escritura; se omite");
        return;
    }

    handler(event);

    if let Some(after) = FileStamp::read(&event.path).filter(|after| *after != before) {
        self_writes.remember(event.path.clone(), after, Instant::now());
    }
}

#[cfg(test)]
mod tests;
