//! Reemplazo atómico del archivo original.

use std::fs;
use std::io::Write;
use std::path::Path;

use filetime::FileTime;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Prefijo de los archivos temporales; su sufijo `.tmp` nunca coincide con
/// una extensión de imagen vigilada.
pub const TEMP_PREFIX: &str = ".exifguard-";
const TEMP_SUFFIX: &str = ".tmp";

/// Escribe `contents` en un temporal junto a `path` y lo renombra encima.
///
/// Si algo falla el temporal se elimina y el original queda intacto. Los
/// permisos originales se copian al temporal antes del renombrado.
pub fn replace_atomically(path: &Path, contents: &[u8], preserve_mtime: bool) -> Result<()> {
    let original = fs::metadata(path).map_err(|e| Error::io(path, e))?;
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut temp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(TEMP_SUFFIX)
        .tempfile_in(parent)
        .map_err(|e| Error::write(path, format!("No se pudo crear el archivo temporal: {}", e)))?;

    temp.write_all(contents)
        .and_then(|()| temp.as_file().sync_all())
        .map_err(|e| Error::write(path, format!("No se pudo escribir el temporal: {}", e)))?;

    fs::set_permissions(temp.path(), original.permissions())
        .map_err(|e| Error::write(path, format!("No se pudieron copiar los permisos: {}", e)))?;

    debug!(temp = %temp.path().display(), "Reemplazando el archivo original");

    // Si el renombrado falla, el `NamedTempFile` dentro del error se borra al soltarse.
    temp.persist(path).map_err(|e| {
        Error::write(
            path,
            format!("No se pudo reemplazar el archivo original: {}", e.error),
        )
    })?;

    if preserve_mtime {
        let mtime = FileTime::from_last_modification_time(&original);
        if let Err(err) = filetime::set_file_mtime(path, mtime) {
            warn!(path = %path.display(), error = %err, "No se pudo restaurar la fecha de modificación");
        }
    }

    Ok(())
}
