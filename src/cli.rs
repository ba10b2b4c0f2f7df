//! Argumentos de línea de comandos.

use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::config::Config;

/// Vigila una carpeta y elimina la metadata sensible de las imágenes que llegan.
#[derive(Debug, Parser)]
#[command(name = "exifguard", version, about)]
pub struct Cli {
    /// Carpeta a vigilar (incluye subcarpetas).
    pub root: PathBuf,

    /// Archivo TOML con la política de limpieza.
    #[arg(long, value_name = "ARCHIVO")]
    pub config: Option<PathBuf>,

    /// Conserva los campos benignos en JPEG y PNG.
    #[arg(long)]
    pub keep_benign: bool,

    /// Milisegundos de calma antes de procesar un archivo.
    #[arg(long, value_name = "MS")]
    pub debounce_ms: Option<u64>,

    /// No restaura la fecha de modificación original.
    #[arg(long)]
    pub no_preserve_mtime: bool,

    /// Omite la comparación de píxeles antes de reemplazar.
    #[arg(long)]
    pub no_verify_pixels: bool,

    /// Limpia también las imágenes que ya están en la carpeta.
    #[arg(long)]
    pub scan_existing: bool,

    /// No imprime el resumen por archivo.
    #[arg(short, long)]
    pub quiet: bool,

    /// Más detalle en los logs (-v depuración, -vv traza).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Aplica las opciones explícitas sobre la configuración cargada.
    ///
    /// Los indicadores solo activan o desactivan; nunca devuelven una opción
    /// del archivo a su valor por defecto.
    pub fn apply_to(&self, config: &mut Config) {
        if self.keep_benign {
            config.keep_benign_tags = true;
        }
        if let Some(ms) = self.debounce_ms {
            config.debounce_ms = ms;
        }
        if self.no_preserve_mtime {
            config.preserve_mtime = false;
        }
        if self.no_verify_pixels {
            config.verify_pixels = false;
        }
        if self.scan_existing {
            config.scan_existing = true;
        }
    }

    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
