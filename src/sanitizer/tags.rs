//! Lectura del bloque EXIF y reconstrucción con los campos benignos.

use std::io::Cursor;

use tracing::{debug, warn};

use super::policy::{Sensitivity, TagPolicy};

const MAX_VALUE_CHARS: usize = 256;

/// Lugar del archivo donde vive una entrada de metadata.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagSource {
    /// IFD principal del bloque EXIF (incluye los sub-IFD Exif, GPS e Interop).
    Primary,
    /// IFD de la miniatura embebida.
    Thumbnail,
    /// Bloque fuera de EXIF: XMP, IPTC, comentarios, chunks de texto, etc.
    Container,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagEntry {
    pub name: String,
    pub value: String,
    pub source: TagSource,
    pub sensitivity: Sensitivity,
}

impl TagEntry {
    /// Entrada para un bloque de contenedor; siempre sensible por ser texto libre.
    pub fn container(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            source: TagSource::Container,
            sensitivity: Sensitivity::Sensitive,
        }
    }

    pub fn is_sensitive(&self) -> bool {
        self.sensitivity.is_sensitive()
    }

    fn same_identity(&self, other: &TagEntry) -> bool {
        self.source == other.source && self.name == other.name
    }
}

/// Resultado de leer el bloque EXIF de un archivo.
pub enum ExifRead {
    Absent,
    Parsed(exif::Exif),
    /// Había un bloque pero no se pudo interpretar.
    Unreadable(String),
}

/// Interpreta un bloque TIFF/EXIF ya extraído de su contenedor.
pub fn read_exif(block: Option<&[u8]>) -> ExifRead {
    let Some(block) = block else {
        return ExifRead::Absent;
    };
    match exif::Reader::new().read_raw(block.to_vec()) {
        Ok(exif) => ExifRead::Parsed(exif),
        Err(exif::Error::NotFound(_)) | Err(exif::Error::BlankValue(_)) => ExifRead::Absent,
        Err(other) => ExifRead::Unreadable(other.to_string()),
    }
}

/// Convierte los campos EXIF en entradas clasificadas según la política.
pub fn exif_entries(exif: &exif::Exif, policy: &TagPolicy) -> Vec<TagEntry> {
    exif.fields()
        .map(|field| TagEntry {
            name: field.tag.to_string(),
            value: describe_field(field, exif),
            source: if field.ifd_num == exif::In::PRIMARY {
                TagSource::Primary
            } else {
                TagSource::Thumbnail
            },
            sensitivity: policy.classify_field(field),
        })
        .collect()
}

fn describe_field(field: &exif::Field, exif: &exif::Exif) -> String {
    if field.tag == exif::Tag::MakerNote {
        let len = match &field.value {
            exif::Value::Undefined(bytes, _) => bytes.len(),
            _ => 0,
        };
        return format!("<datos del fabricante: {} bytes>", len);
    }

    let rendered = field.display_value().with_unit(exif).to_string();
    truncate_chars(&rendered, MAX_VALUE_CHARS)
}

pub(crate) fn truncate_chars(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let mut truncated: String = value.chars().take(limit).collect();
    truncated.push_str("...");
    truncated
}

/// Campos que el escritor de EXIF genera por su cuenta y no admite como entrada.
fn is_structural(tag: exif::Tag) -> bool {
    [
        exif::Tag::ExifIFDPointer,
        exif::Tag::GPSInfoIFDPointer,
        exif::Tag::InteropIFDPointer,
        exif::Tag::StripOffsets,
        exif::Tag::StripByteCounts,
        exif::Tag::TileOffsets,
        exif::Tag::TileByteCounts,
        exif::Tag::JPEGInterchangeFormat,
        exif::Tag::JPEGInterchangeFormatLength,
    ]
    .contains(&tag)
}

/// Reconstruye un bloque TIFF/EXIF con los campos benignos del IFD principal.
///
/// Devuelve `None` cuando no queda nada que conservar o cuando el escritor
/// rechaza algún campo; en ese caso se descarta todo el bloque.
pub fn rebuild_benign_block(exif: &exif::Exif, policy: &TagPolicy) -> Option<Vec<u8>> {
    let kept: Vec<&exif::Field> = exif
        .fields()
        .filter(|field| field.ifd_num == exif::In::PRIMARY)
        .filter(|field| !is_structural(field.tag))
        .filter(|field| policy.classify_field(field) == Sensitivity::Benign)
        .collect();

    if kept.is_empty() {
        debug!("No quedan campos benignos que conservar");
        return None;
    }

    let mut writer = exif::experimental::Writer::new();
    for field in &kept {
        writer.push_field(field);
    }

    let mut buffer = Cursor::new(Vec::new());
    match writer.write(&mut buffer, exif.little_endian()) {
        Ok(()) => Some(buffer.into_inner()),
        Err(err) => {
            warn!(error = %err, "No se pudo reconstruir el bloque EXIF benigno; se descarta completo");
            None
        }
    }
}

/// Entradas de `before` que no aparecen en `after`, respetando repeticiones.
pub fn removed_entries(before: &[TagEntry], after: &[TagEntry]) -> Vec<TagEntry> {
    let mut remaining: Vec<&TagEntry> = after.iter().collect();
    let mut removed = Vec::new();

    for entry in before {
        match remaining.iter().position(|other| entry.same_identity(other)) {
            Some(index) => {
                remaining.swap_remove(index);
            }
            None => removed.push(entry.clone()),
        }
    }

    removed
}
