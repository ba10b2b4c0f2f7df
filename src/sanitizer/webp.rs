//! Recorrido de los chunks RIFF de WebP para inventariar su metadata.
//!
//! WebP se re-codifica al limpiar, así que aquí solo se lee.

use super::tags::TagEntry;

const RIFF: &[u8] = b"RIFF";
const WEBP: &[u8] = b"WEBP";
const EXIF_CHUNK: [u8; 4] = *b"EXIF";
const XMP_CHUNK: [u8; 4] = *b"XMP ";
const EXIF_PREFIX: &[u8] = b"Exif\0\0";

pub struct WebpLayout<'a> {
    chunks: Vec<([u8; 4], &'a [u8])>,
}

impl<'a> WebpLayout<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self, String> {
        if data.len() < 12 || &data[0..4] != RIFF || &data[8..12] != WEBP {
            return Err("Cabecera RIFF/WEBP inválida".to_string());
        }

        let mut chunks = Vec::new();
        let mut pos = 12;
        while pos + 8 <= data.len() {
            let fourcc = [data[pos], data[pos + 1], data[pos + 2], data[pos + 3]];
            let size =
                u32::from_le_bytes([data[pos + 4], data[pos + 5], data[pos + 6], data[pos + 7]])
                    as usize;
            let start = pos + 8;
            let end = start.saturating_add(size).min(data.len());
            chunks.push((fourcc, &data[start..end]));
            // Los chunks se rellenan hasta un tamaño par.
            pos = start.saturating_add(size).saturating_add(size & 1);
        }

        Ok(Self { chunks })
    }

    /// Bloque TIFF del chunk `EXIF`. Algunos escritores anteponen `Exif\0\0`.
    pub fn exif_payload(&self) -> Option<&'a [u8]> {
        self.chunks
            .iter()
            .find(|(fourcc, _)| *fourcc == EXIF_CHUNK)
            .map(|&(_, data)| data.strip_prefix(EXIF_PREFIX).unwrap_or(data))
    }

    pub fn container_entries(&self) -> Vec<TagEntry> {
        self.chunks
            .iter()
            .filter(|(fourcc, _)| *fourcc == XMP_CHUNK)
            .map(|(_, data)| TagEntry::container("XMP", format!("<{} bytes>", data.len())))
            .collect()
    }
}
