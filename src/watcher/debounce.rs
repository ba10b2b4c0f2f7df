//! Agrupa ráfagas de eventos sobre la misma ruta en uno solo.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime};

use super::WatchEvent;

#[derive(Debug)]
struct Pending {
    last_seen: Instant,
    first_seen: SystemTime,
    hits: usize,
}

/// Rutas pendientes a la espera de un periodo de calma.
///
/// Una ruta se considera asentada cuando pasa `quiet` sin recibir eventos.
/// Cada evento nuevo reinicia su espera.
#[derive(Debug)]
pub struct Debouncer {
    quiet: Duration,
    pending: HashMap<PathBuf, Pending>,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: HashMap::new(),
        }
    }

    pub fn record(&mut self, path: PathBuf, now: Instant) {
        self.pending
            .entry(path)
            .and_modify(|pending| {
                pending.last_seen = now;
                pending.hits += 1;
            })
            .or_insert_with(|| Pending {
                last_seen: now,
                first_seen: SystemTime::now(),
                hits: 1,
            });
    }

    /// Momento en que la ruta más antigua quedará asentada.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending
            .values()
            .map(|pending| pending.last_seen + self.quiet)
            .min()
    }

    /// Extrae las rutas asentadas en `now`, ordenadas por su último evento.
    pub fn take_settled(&mut self, now: Instant) -> Vec<WatchEvent> {
        let quiet = self.quiet;
        let settled: Vec<PathBuf> = self
            .pending
            .iter()
            .filter(|(_, pending)| now.saturating_duration_since(pending.last_seen) >= quiet)
            .map(|(path, _)| path.clone())
            .collect();

        let mut taken: Vec<(PathBuf, Pending)> = settled
            .into_iter()
            .filter_map(|path| self.pending.remove_entry(&path))
            .collect();
        into_events(&mut taken)
    }

    /// Extrae todas las rutas pendientes sin esperar.
    pub fn drain_all(&mut self) -> Vec<WatchEvent> {
        let mut taken: Vec<(PathBuf, Pending)> = self.pending.drain().collect();
        into_events(&mut taken)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

fn into_events(taken: &mut Vec<(PathBuf, Pending)>) -> Vec<WatchEvent> {
    taken.sort_by_key(|(_, pending)| pending.last_seen);
    taken
        .drain(..)
        .map(|(path, pending)| WatchEvent {
            path,
            first_seen: pending.first_seen,
            coalesced: pending.hits,
        })
        .collect()
}
