//! Reescritura sin pérdida de JPEG a nivel de segmentos.
//!
//! El escaneo entrópico se copia tal cual, así que los píxeles decodificados no
//! cambian. Solo se descartan los segmentos de metadata:
//!
//! - APP1 (EXIF, XMP)
//! - APP2 que no sea un perfil ICC (FlashPix, MPF)
//! - APP3..APP12, APP13 (IPTC/Photoshop), APP15
//! - COM (comentarios)
//! - cualquier dato tras el marcador EOI
//!
//! APP0 (JFIF), el perfil ICC y APP14 (Adobe) se conservan porque influyen en
//! cómo se interpretan los colores.

use super::tags::{TagEntry, truncate_chars};

const PREFIX: u8 = 0xFF;
const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
const SOS: u8 = 0xDA;
const TEM: u8 = 0x01;
const APP0: u8 = 0xE0;
const APP1: u8 = 0xE1;
const APP2: u8 = 0xE2;
const APP13: u8 = 0xED;
const APP14: u8 = 0xEE;
const APP15: u8 = 0xEF;
const COM: u8 = 0xFE;

const EXIF_HEADER: &[u8] = b"Exif\0\0";
const XMP_HEADER: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";
const XMP_EXTENSION_HEADER: &[u8] = b"http://ns.adobe.com/xmp/extension/\0";
const ICC_HEADER: &[u8] = b"ICC_PROFILE\0";
const MPF_HEADER: &[u8] = b"MPF\0";

/// Tamaño máximo de un bloque TIFF que cabe en un segmento APP1.
pub const MAX_EXIF_BLOCK: usize = u16::MAX as usize - 2 - EXIF_HEADER.len();

const MAX_COMMENT_CHARS: usize = 100;

#[derive(Debug, PartialEq, Eq)]
enum SegmentKind {
    Keep,
    Exif,
    Strip(String),
}

struct Segment<'a> {
    marker: u8,
    payload: &'a [u8],
    raw: &'a [u8],
}

impl Segment<'_> {
    fn kind(&self) -> SegmentKind {
        match self.marker {
            APP1 if self.payload.starts_with(EXIF_HEADER) => SegmentKind::Exif,
            APP1 if self.payload.starts_with(XMP_HEADER)
                || self.payload.starts_with(XMP_EXTENSION_HEADER) =>
            {
                SegmentKind::Strip("XMP".to_string())
            }
            APP2 if self.payload.starts_with(ICC_HEADER) => SegmentKind::Keep,
            APP2 if self.payload.starts_with(MPF_HEADER) => SegmentKind::Strip("MPF".to_string()),
            APP13 => SegmentKind::Strip("IPTC".to_string()),
            COM => SegmentKind::Strip("Comment".to_string()),
            APP0 | APP14 => SegmentKind::Keep,
            APP1..=APP15 => SegmentKind::Strip(format!("APP{}", self.marker - APP0)),
            _ => SegmentKind::Keep,
        }
    }

    fn describe(&self) -> String {
        if self.marker == COM {
            let text = String::from_utf8_lossy(self.payload);
            return truncate_chars(text.trim_end_matches('\0'), MAX_COMMENT_CHARS);
        }
        format!("<{} bytes>", self.payload.len())
    }
}

/// Estructura de un JPEG: segmentos de cabecera, escaneo y bytes sobrantes.
pub struct JpegLayout<'a> {
    segments: Vec<Segment<'a>>,
    scan: &'a [u8],
    trailing: &'a [u8],
}

impl<'a> JpegLayout<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self, String> {
        if data.len() < 4 || data[0] != PREFIX || data[1] != SOI {
            return Err("Falta el marcador SOI de JPEG".to_string());
        }

        let mut segments = Vec::new();
        let mut pos = 2;

        loop {
            if pos >= data.len() {
                return Err("El archivo termina antes del inicio del escaneo".to_string());
            }
            if data[pos] != PREFIX {
                return Err(format!("Se esperaba un marcador en la posición {}", pos));
            }

            // Bytes de relleno 0xFF antes del marcador.
            while pos < data.len() && data[pos] == PREFIX {
                pos += 1;
            }
            if pos >= data.len() {
                return Err("Marcador JPEG truncado".to_string());
            }

            let marker_start = pos - 1;
            let marker = data[pos];
            pos += 1;

            match marker {
                EOI => {
                    return Ok(Self {
                        segments,
                        scan: &data[marker_start..pos],
                        trailing: &data[pos..],
                    });
                }
                SOS => {
                    let end = find_scan_end(data, pos)?;
                    return Ok(Self {
                        segments,
                        scan: &data[marker_start..end],
                        trailing: &data[end..],
                    });
                }
                TEM | 0xD0..=0xD7 => {
                    segments.push(Segment {
                        marker,
                        payload: &[],
                        raw: &data[marker_start..pos],
                    });
                }
                _ => {
                    let length = read_length(data, pos)?;
                    let end = pos + length;
                    segments.push(Segment {
                        marker,
                        payload: &data[pos + 2..end],
                        raw: &data[marker_start..end],
                    });
                    pos = end;
                }
            }
        }
    }

    /// Bloque TIFF del primer segmento Exif, sin la cabecera `Exif\0\0`.
    pub fn exif_payload(&self) -> Option<&'a [u8]> {
        self.segments
            .iter()
            .find(|segment| segment.kind() == SegmentKind::Exif)
            .map(|segment| {
                let payload: &'a [u8] = segment.payload;
                &payload[EXIF_HEADER.len()..]
            })
    }

    /// Bloques de metadata fuera de EXIF que la limpieza descartaría.
    pub fn container_entries(&self) -> Vec<TagEntry> {
        let mut entries: Vec<TagEntry> = self
            .segments
            .iter()
            .filter_map(|segment| match segment.kind() {
                SegmentKind::Strip(label) => Some(TagEntry::container(label, segment.describe())),
                _ => None,
            })
            .collect();

        if !self.trailing.is_empty() {
            entries.push(TagEntry::container(
                "TrailingData",
                format!("<{} bytes tras el fin de la imagen>", self.trailing.len()),
            ));
        }

        entries
    }

    /// Genera el JPEG limpio, opcionalmente con un nuevo bloque EXIF.
    ///
    /// `exif_block` debe ser un bloque TIFF de como mucho [`MAX_EXIF_BLOCK`] bytes.
    pub fn rebuild(&self, exif_block: Option<&[u8]>) -> Vec<u8> {
        let mut output = Vec::with_capacity(self.scan.len() + 1024);
        output.extend_from_slice(&[PREFIX, SOI]);

        let mut pending_exif = exif_block;
        for segment in &self.segments {
            if segment.marker != APP0
                && let Some(block) = pending_exif.take()
            {
                write_exif_segment(&mut output, block);
            }
            if segment.kind() == SegmentKind::Keep {
                output.extend_from_slice(segment.raw);
            }
        }
        if let Some(block) = pending_exif {
            write_exif_segment(&mut output, block);
        }

        output.extend_from_slice(self.scan);
        output
    }
}

fn write_exif_segment(output: &mut Vec<u8>, block: &[u8]) {
    let length = (2 + EXIF_HEADER.len() + block.len()) as u16;
    output.extend_from_slice(&[PREFIX, APP1]);
    output.extend_from_slice(&length.to_be_bytes());
    output.extend_from_slice(EXIF_HEADER);
    output.extend_from_slice(block);
}

fn read_length(data: &[u8], pos: usize) -> Result<usize, String> {
    if pos + 2 > data.len() {
        return Err(format!("Longitud de segmento truncada en {}", pos));
    }
    let length = u16::from_be_bytes([data[pos], data[pos + 1]]) as usize;
    if length < 2 || pos + length > data.len() {
        return Err(format!("Segmento fuera de los límites del archivo en {}", pos));
    }
    Ok(length)
}

/// Devuelve la posición justo después del EOI que cierra la imagen principal.
///
/// `pos` apunta a la longitud de la cabecera SOS. Entre escaneos progresivos
/// pueden aparecer tablas y otros segmentos con longitud.
fn find_scan_end(data: &[u8], pos: usize) -> Result<usize, String> {
    let mut pos = pos + read_length(data, pos)?;

    loop {
        match memchr::memchr(PREFIX, &data[pos..]) {
            Some(offset) => pos += offset,
            // Escaneo sin EOI: el decodificador lo aceptó, se conserva entero.
            None => return Ok(data.len()),
        }
        if pos + 1 >= data.len() {
            return Ok(data.len());
        }

        match data[pos + 1] {
            0x00 | TEM | 0xD0..=0xD7 => pos += 2,
            PREFIX => pos += 1,
            EOI => return Ok(pos + 2),
            _ => {
                let length = read_length(data, pos + 2)?;
                pos += 2 + length;
            }
        }
    }
}
