//! Configuración de la política de limpieza y del vigilante.
//!
//! Los valores por defecto reproducen las listas fijas de extensiones y de
//! campos sensibles. Un archivo TOML opcional puede reemplazar cualquiera de
//! ellos y la línea de comandos tiene la última palabra.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Extensiones de imagen vigiladas por defecto.
pub const DEFAULT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tiff", "tif", "bmp", "webp"];

/// Campos considerados sensibles por defecto.
///
/// Se comparan sin distinguir mayúsculas y por contención, así que `SerialNumber`
/// también cubre `BodySerialNumber` y `LensSerialNumber`.
pub const DEFAULT_SENSITIVE_TAGS: &[&str] = &[
    "SerialNumber",
    "Make",
    "Model",
    "Software",
    "Artist",
    "Copyright",
    "OwnerName",
    "GPSInfo",
    "GPSLatitude",
    "GPSLongitude",
    "GPSAltitude",
    "DateTime",
    "SubSecTime",
    "OffsetTime",
    "MakerNote",
    "UserComment",
    "ImageUniqueID",
    "DocumentName",
    "HostComputer",
];

const MAX_DEBOUNCE_MS: u64 = 60_000;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Extensiones (sin punto) que disparan la limpieza.
    pub watched_extensions: BTreeSet<String>,
    /// Nombres de campos EXIF que se consideran sensibles.
    pub sensitive_tags: BTreeSet<String>,
    /// Conserva los campos benignos en JPEG y PNG en lugar de descartar todo el bloque.
    pub keep_benign_tags: bool,
    /// Tiempo de calma que debe pasar antes de procesar un archivo.
    pub debounce_ms: u64,
    /// Restaura la fecha de modificación original tras reescribir.
    pub preserve_mtime: bool,
    /// Compara los píxeles antes y después antes de reemplazar el archivo.
    pub verify_pixels: bool,
    /// Limpia las imágenes que ya existen en la carpeta al arrancar.
    pub scan_existing: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            watched_extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            sensitive_tags: DEFAULT_SENSITIVE_TAGS
                .iter()
                .map(|t| t.to_string())
                .collect(),
            keep_benign_tags: false,
            debounce_ms: 500,
            preserve_mtime: true,
            verify_pixels: true,
            scan_existing: false,
        }
    }
}

impl Config {
    /// Carga la configuración desde `path`, o devuelve los valores por defecto.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let contents = fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "No se pudo leer el archivo de configuración {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)
            .map_err(|e| Error::config(format!("TOML inválido: {}", e)))?;
        config.normalized()
    }

    /// Normaliza extensiones a minúsculas sin punto y valida los límites.
    pub fn normalized(mut self) -> Result<Self> {
        self.watched_extensions = self
            .watched_extensions
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();

        self.sensitive_tags = self
            .sensitive_tags
            .iter()
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect();

        if self.watched_extensions.is_empty() {
            return Err(Error::config(
                "La lista de extensiones vigiladas no puede estar vacía",
            ));
        }

        if self.debounce_ms > MAX_DEBOUNCE_MS {
            return Err(Error::config(format!(
                "debounce_ms debe ser como máximo {} (recibido {})",
                MAX_DEBOUNCE_MS, self.debounce_ms
            )));
        }

        Ok(self)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Indica si la extensión de `path` está en la lista vigilada.
    pub fn watches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.watched_extensions.contains(&e.to_lowercase()))
            .unwrap_or(false)
    }
}
