//! Limpieza de metadata de una imagen individual.

use std::fs;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use tracing::{debug, warn};

use super::format::{self, ImageKind};
use super::jpeg::{JpegLayout, MAX_EXIF_BLOCK};
use super::png::{self as png_chunks, PngLayout};
use super::policy::TagPolicy;
use super::tags::{self, ExifRead, TagEntry};
use super::webp::WebpLayout;
use super::write::replace_atomically;
use crate::config::Config;
use crate::error::{Error, Result};

/// Resultado de limpiar un archivo.
#[derive(Clone, Debug)]
pub struct CleanReport {
    pub path: PathBuf,
    pub format: ImageKind,
    /// Metadata encontrada antes de limpiar, con su clasificación.
    pub before: Vec<TagEntry>,
    /// Entradas que ya no están en el archivo limpio.
    pub removed: Vec<TagEntry>,
    /// Entradas que siguen presentes tras la limpieza.
    pub retained: Vec<TagEntry>,
    /// `false` cuando no había nada que eliminar y el archivo no se tocó.
    pub written: bool,
}

impl CleanReport {
    fn unchanged(path: &Path, format: ImageKind, before: Vec<TagEntry>) -> Self {
        Self {
            path: path.to_path_buf(),
            format,
            retained: before.clone(),
            before,
            removed: Vec::new(),
            written: false,
        }
    }

    pub fn removed_sensitive(&self) -> usize {
        self.removed.iter().filter(|e| e.is_sensitive()).count()
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Sanitizador de metadata. No guarda estado entre archivos.
#[derive(Clone, Debug)]
pub struct Sanitizer {
    policy: TagPolicy,
    keep_benign_tags: bool,
    preserve_mtime: bool,
    verify_pixels: bool,
}

impl Sanitizer {
    pub fn new(config: &Config) -> Self {
        Self {
            policy: TagPolicy::new(&config.sensitive_tags),
            keep_benign_tags: config.keep_benign_tags,
            preserve_mtime: config.preserve_mtime,
            verify_pixels: config.verify_pixels,
        }
    }

    /// Elimina la metadata de `path` manteniendo intactos los píxeles.
    ///
    /// Los archivos que no se pueden decodificar devuelven [`Error::Decode`] y
    /// no se modifican. Una imagen sin campos sensibles tampoco se reescribe,
    /// así que llamarlo sobre un archivo ya limpio no escribe nada.
    pub fn clean(&self, path: &Path) -> Result<CleanReport> {
        let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
        let kind = format::detect(&bytes, path).map_err(|e| Error::decode(path, e))?;
        let pixels = image::load_from_memory_with_format(&bytes, kind.format())
            .map_err(|e| Error::decode(path, e))?;

        let before = self
            .inventory(&bytes, kind)
            .map_err(|e| Error::decode(path, e))?;

        if !before.iter().any(TagEntry::is_sensitive) {
            debug!(path = %path.display(), "Sin metadata sensible que eliminar");
            return Ok(CleanReport::unchanged(path, kind, before));
        }

        let cleaned = self.cleaned_bytes(path, &bytes, kind, &pixels)?;
        let after = self
            .inventory(&cleaned, kind)
            .map_err(|e| Error::verify(path, e))?;

        if let Some(leftover) = after.iter().find(|entry| entry.is_sensitive()) {
            return Err(Error::verify(
                path,
                format!("El campo sensible {} sigue presente", leftover.name),
            ));
        }

        let removed = tags::removed_entries(&before, &after);
        if removed.is_empty() {
            debug!(path = %path.display(), "La metadata ya estaba limpia");
            return Ok(CleanReport::unchanged(path, kind, before));
        }

        if self.verify_pixels {
            let decoded = image::load_from_memory_with_format(&cleaned, kind.format())
                .map_err(|e| Error::verify(path, format!("La imagen limpia no decodifica: {}", e)))?;
            if !same_pixels(&pixels, &decoded) {
                return Err(Error::verify(path, "Los píxeles cambiaron durante la limpieza"));
            }
        }

        replace_atomically(path, &cleaned, self.preserve_mtime)?;

        Ok(CleanReport {
            path: path.to_path_buf(),
            format: kind,
            before,
            removed,
            retained: after,
            written: true,
        })
    }

    /// Lista la metadata de un archivo ya cargado, sin modificarlo.
    pub fn inventory(&self, bytes: &[u8], kind: ImageKind) -> std::result::Result<Vec<TagEntry>, String> {
        let (container, exif_block) = match kind {
            ImageKind::Jpeg => {
                let layout = JpegLayout::parse(bytes)?;
                (layout.container_entries(), layout.exif_payload())
            }
            ImageKind::Png => {
                let layout = PngLayout::parse(bytes)?;
                let texts = png_chunks::text_values(bytes);
                (layout.container_entries(&texts), layout.exif_payload())
            }
            ImageKind::WebP => {
                let layout = WebpLayout::parse(bytes)?;
                (layout.container_entries(), layout.exif_payload())
            }
            // El propio archivo es el bloque TIFF.
            ImageKind::Tiff => (Vec::new(), Some(bytes)),
            ImageKind::Bmp => (Vec::new(), None),
        };

        let mut entries = match tags::read_exif(exif_block) {
            ExifRead::Parsed(exif) => tags::exif_entries(&exif, &self.policy),
            ExifRead::Unreadable(reason) => {
                vec![TagEntry::container("Exif", format!("<bloque ilegible: {}>", reason))]
            }
            ExifRead::Absent => Vec::new(),
        };

        entries.extend(container);
        Ok(entries)
    }

    fn cleaned_bytes(
        &self,
        path: &Path,
        bytes: &[u8],
        kind: ImageKind,
        pixels: &DynamicImage,
    ) -> Result<Vec<u8>> {
        match kind {
            ImageKind::Jpeg => {
                let layout = JpegLayout::parse(bytes).map_err(|e| Error::decode(path, e))?;
                let block = self.benign_block(path, layout.exif_payload(), MAX_EXIF_BLOCK);
                Ok(layout.rebuild(block.as_deref()))
            }
            ImageKind::Png => {
                let layout = PngLayout::parse(bytes).map_err(|e| Error::decode(path, e))?;
                let block = self.benign_block(path, layout.exif_payload(), u32::MAX as usize);
                Ok(layout.rebuild(block.as_deref()))
            }
            ImageKind::Tiff | ImageKind::Bmp | ImageKind::WebP => {
                if self.keep_benign_tags {
                    debug!(
                        path = %path.display(),
                        format = kind.name(),
                        "El formato se re-codifica; los campos benignos no se conservan"
                    );
                }
                format::reencode(pixels, kind).map_err(|e| {
                    Error::write(path, format!("No se pudo codificar la imagen limpia: {}", e))
                })
            }
        }
    }

    fn benign_block(&self, path: &Path, exif_block: Option<&[u8]>, limit: usize) -> Option<Vec<u8>> {
        if !self.keep_benign_tags {
            return None;
        }
        let ExifRead::Parsed(exif) = tags::read_exif(exif_block) else {
            return None;
        };
        let block = tags::rebuild_benign_block(&exif, &self.policy)?;
        if block.len() > limit {
            warn!(
                path = %path.display(),
                size = block.len(),
                "El bloque EXIF benigno no cabe en el contenedor; se descarta"
            );
            return None;
        }
        Some(block)
    }
}

/// Compara píxeles aunque el decodificador devuelva otro tipo de color equivalente.
fn same_pixels(a: &DynamicImage, b: &DynamicImage) -> bool {
    if a.width() != b.width() || a.height() != b.height() {
        return false;
    }
    if a.color() == b.color() {
        return a.as_bytes() == b.as_bytes();
    }
    a.to_rgba32f() == b.to_rgba32f()
}
