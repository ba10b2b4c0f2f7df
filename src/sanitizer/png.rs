//! Reescritura sin pérdida de PNG a nivel de chunks.
//!
//! Se descartan `eXIf`, `tEXt`, `zTXt`, `iTXt` y `tIME`. El resto de chunks se
//! copian con su CRC original; solo el `eXIf` reconstruido necesita CRC nuevo.

use std::collections::HashMap;
use std::io::Cursor;

use super::tags::{TagEntry, truncate_chars};

const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

const EXIF_CHUNK: [u8; 4] = *b"eXIf";
const TEXT_CHUNKS: [[u8; 4]; 3] = [*b"tEXt", *b"zTXt", *b"iTXt"];
const TIME_CHUNK: [u8; 4] = *b"tIME";
const IDAT: [u8; 4] = *b"IDAT";
const IEND: [u8; 4] = *b"IEND";

const MAX_TEXT_CHARS: usize = 100;

struct Chunk<'a> {
    kind: [u8; 4],
    data: &'a [u8],
    raw: &'a [u8],
}

impl Chunk<'_> {
    fn is_metadata(&self) -> bool {
        self.kind == EXIF_CHUNK || self.kind == TIME_CHUNK || TEXT_CHUNKS.contains(&self.kind)
    }

    fn keyword(&self) -> String {
        let end = self
            .data
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.data.len());
        String::from_utf8_lossy(&self.data[..end]).into_owned()
    }
}

pub struct PngLayout<'a> {
    chunks: Vec<Chunk<'a>>,
    trailing: &'a [u8],
}

impl<'a> PngLayout<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self, String> {
        if !data.starts_with(&SIGNATURE) {
            return Err("Firma PNG inválida".to_string());
        }

        let mut chunks = Vec::new();
        let mut pos = SIGNATURE.len();

        while pos < data.len() {
            if pos + 8 > data.len() {
                return Err(format!("Cabecera de chunk truncada en {}", pos));
            }
            let length =
                u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
                    as usize;
            let kind = [data[pos + 4], data[pos + 5], data[pos + 6], data[pos + 7]];
            let end = pos
                .checked_add(12)
                .and_then(|v| v.checked_add(length))
                .filter(|&end| end <= data.len())
                .ok_or_else(|| format!("Chunk fuera de los límites del archivo en {}", pos))?;

            chunks.push(Chunk {
                kind,
                data: &data[pos + 8..pos + 8 + length],
                raw: &data[pos..end],
            });
            pos = end;

            if kind == IEND {
                break;
            }
        }

        Ok(Self {
            chunks,
            trailing: &data[pos..],
        })
    }

    pub fn exif_payload(&self) -> Option<&'a [u8]> {
        self.chunks
            .iter()
            .find(|chunk| chunk.kind == EXIF_CHUNK)
            .map(|chunk| chunk.data)
    }

    /// Chunks de texto y de fecha que la limpieza descartaría.
    ///
    /// `texts` trae los valores ya descomprimidos, indexados por palabra clave.
    pub fn container_entries(&self, texts: &HashMap<String, String>) -> Vec<TagEntry> {
        let mut entries: Vec<TagEntry> = self
            .chunks
            .iter()
            .filter_map(|chunk| {
                if TEXT_CHUNKS.contains(&chunk.kind) {
                    let keyword = chunk.keyword();
                    let value = texts
                        .get(&keyword)
                        .map(|text| truncate_chars(text, MAX_TEXT_CHARS))
                        .unwrap_or_else(|| format!("<{} bytes>", chunk.data.len()));
                    Some(TagEntry::container(format!("Text:{}", keyword), value))
                } else if chunk.kind == TIME_CHUNK {
                    Some(TagEntry::container("ModifyTime", describe_time(chunk.data)))
                } else {
                    None
                }
            })
            .collect();

        if !self.trailing.is_empty() {
            entries.push(TagEntry::container(
                "TrailingData",
                format!("<{} bytes tras IEND>", self.trailing.len()),
            ));
        }

        entries
    }

    /// Genera el PNG limpio; un `exif_block` se inserta como `eXIf` antes del primer IDAT.
    pub fn rebuild(&self, exif_block: Option<&[u8]>) -> Vec<u8> {
        let capacity: usize = self.chunks.iter().map(|c| c.raw.len()).sum();
        let mut output = Vec::with_capacity(SIGNATURE.len() + capacity + 64);
        output.extend_from_slice(&SIGNATURE);

        let mut pending_exif = exif_block;
        for chunk in &self.chunks {
            if chunk.kind == IDAT
                && let Some(block) = pending_exif.take()
            {
                write_chunk(&mut output, EXIF_CHUNK, block);
            }
            if !chunk.is_metadata() {
                output.extend_from_slice(chunk.raw);
            }
        }

        output
    }
}

/// Valores de los chunks de texto situados antes de los datos de imagen.
///
/// Se apoya en el decodificador de `png` para descomprimir `zTXt` e `iTXt`.
pub fn text_values(data: &[u8]) -> HashMap<String, String> {
    let mut values = HashMap::new();
    let Ok(reader) = ::png::Decoder::new(Cursor::new(data)).read_info() else {
        return values;
    };
    let info = reader.info();

    for chunk in &info.uncompressed_latin1_text {
        values.insert(chunk.keyword.clone(), chunk.text.clone());
    }
    for chunk in &info.compressed_latin1_text {
        if let Ok(text) = chunk.get_text() {
            values.insert(chunk.keyword.clone(), text);
        }
    }
    for chunk in &info.utf8_text {
        if let Ok(text) = chunk.get_text() {
            values.insert(chunk.keyword.clone(), text);
        }
    }

    values
}

fn describe_time(data: &[u8]) -> String {
    if data.len() != 7 {
        return format!("<{} bytes>", data.len());
    }
    let year = u16::from_be_bytes([data[0], data[1]]);
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        year, data[2], data[3], data[4], data[5], data[6]
    )
}

pub(super) fn write_chunk(output: &mut Vec<u8>, kind: [u8; 4], data: &[u8]) {
    output.extend_from_slice(&(data.len() as u32).to_be_bytes());
    output.extend_from_slice(&kind);
    output.extend_from_slice(data);
    let crc = crc32(&[&kind[..], data]);
    output.extend_from_slice(&crc.to_be_bytes());
}

/// CRC-32 (polinomio 0xEDB88320) tal como lo define PNG.
fn crc32(parts: &[&[u8]]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for part in parts {
        for &byte in *part {
            crc ^= u32::from(byte);
            for _ in 0..8 {
                let mask = (crc & 1).wrapping_neg();
                crc = (crc >> 1) ^ (0xEDB8_8320 & mask);
            }
        }
    }
    !crc
}
