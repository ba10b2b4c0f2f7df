//! Tipos de error compartidos por el sanitizador y el vigilante de directorios.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Alias de `Result` usado en todo el crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errores posibles al limpiar una imagen o al preparar la vigilancia.
#[derive(Debug, Error)]
pub enum Error {
    #[error("No se pudo decodificar {} como imagen: {details}", path.display())]
    Decode { path: PathBuf, details: String },

    #[error("No se pudo guardar la imagen limpia en {}: {details}", path.display())]
    Write { path: PathBuf, details: String },

    #[error("La verificación de {} falló: {details}", path.display())]
    Verify { path: PathBuf, details: String },

    #[error("No se puede vigilar {}: {details}", path.display())]
    WatchSetup { path: PathBuf, details: String },

    #[error("Configuración inválida: {details}")]
    Config { details: String },

    #[error("Error de E/S en {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Etiqueta estable para los logs estructurados.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Decode { .. } => "decode",
            Self::Write { .. } => "write",
            Self::Verify { .. } => "verify",
            Self::WatchSetup { .. } => "watch_setup",
            Self::Config { .. } => "config",
            Self::Io { .. } => "io",
        }
    }

    pub fn decode(path: impl AsRef<Path>, details: impl ToString) -> Self {
        Self::Decode {
            path: path.as_ref().to_path_buf(),
            details: details.to_string(),
        }
    }

    pub fn write(path: impl AsRef<Path>, details: impl ToString) -> Self {
        Self::Write {
            path: path.as_ref().to_path_buf(),
            details: details.to_string(),
        }
    }

    pub fn verify(path: impl AsRef<Path>, details: impl ToString) -> Self {
        Self::Verify {
            path: path.as_ref().to_path_buf(),
            details: details.to_string(),
        }
    }

    pub fn watch_setup(path: impl AsRef<Path>, details: impl ToString) -> Self {
        Self::WatchSetup {
            path: path.as_ref().to_path_buf(),
            details: details.to_string(),
        }
    }

    pub fn config(details: impl ToString) -> Self {
        Self::Config {
            details: details.to_string(),
        }
    }

    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}
