//! Detección de formato y re-codificación de los formatos sin reescritura por contenedor.

use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, ImageFormat};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Tiff,
    Bmp,
    WebP,
}

impl ImageKind {
    fn from_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(Self::Jpeg),
            ImageFormat::Png => Some(Self::Png),
            ImageFormat::Tiff => Some(Self::Tiff),
            ImageFormat::Bmp => Some(Self::Bmp),
            ImageFormat::WebP => Some(Self::WebP),
            _ => None,
        }
    }

    pub fn format(self) -> ImageFormat {
        match self {
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
            Self::Tiff => ImageFormat::Tiff,
            Self::Bmp => ImageFormat::Bmp,
            Self::WebP => ImageFormat::WebP,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
            Self::Tiff => "TIFF",
            Self::Bmp => "BMP",
            Self::WebP => "WebP",
        }
    }
}

/// Detecta el formato por contenido y, si no se reconoce, por la extensión.
pub fn detect(bytes: &[u8], path: &Path) -> Result<ImageKind, String> {
    let format = image::guess_format(bytes)
        .or_else(|_| ImageFormat::from_path(path))
        .map_err(|e| format!("Formato desconocido: {}", e))?;

    ImageKind::from_format(format)
        .ok_or_else(|| format!("Formato {:?} no soportado para limpieza", format))
}

/// Vuelve a codificar los píxeles sin ningún bloque de metadata.
pub fn reencode(pixels: &DynamicImage, kind: ImageKind) -> image::ImageResult<Vec<u8>> {
    let mut output = Cursor::new(Vec::new());
    pixels.write_to(&mut output, kind.format())?;
    Ok(output.into_inner())
}
