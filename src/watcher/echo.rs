//! Memoria de las escrituras propias para no reprocesar su eco.
//!
//! Reemplazar un archivo con un rename genera un evento más sobre la misma
//! ruta. Si al asentarse el archivo sigue igual que justo después de
//! limpiarlo, ese evento es nuestro y se descarta.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use filetime::FileTime;

/// Tamaño y fecha de modificación de un archivo regular.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileStamp {
    len: u64,
    modified: FileTime,
}

impl FileStamp {
    /// `None` si la ruta no existe o no es un archivo regular.
    pub fn read(path: &Path) -> Option<Self> {
        let meta = fs::metadata(path).ok()?;
        if !meta.is_file() {
            return None;
        }
        Some(Self {
            len: meta.len(),
            modified: FileTime::from_last_modification_time(&meta),
        })
    }
}

#[derive(Debug)]
pub struct SelfWrites {
    ttl: Duration,
    entries: HashMap<PathBuf, (FileStamp, Instant)>,
}

impl SelfWrites {
    /// Las entradas sin eco caducan pasado `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn remember(&mut self, path: PathBuf, stamp: FileStamp, now: Instant) {
        self.entries.insert(path, (stamp, now));
    }

    /// Consume la entrada de `path` y dice si `current` coincide con lo que
    /// dejó nuestra escritura.
    pub fn is_echo(&mut self, path: &Path, current: FileStamp) -> bool {
        self.entries
            .remove(path)
            .is_some_and(|(stamp, _)| stamp == current)
    }

    pub fn prune(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.entries
            .retain(|_, (_, recorded)| now.saturating_duration_since(*recorded) < ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
