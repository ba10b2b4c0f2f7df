//! exifguard: vigila una carpeta y elimina la metadata sensible de las imágenes
//! que aparecen en ella, sin tocar sus píxeles.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod report;
pub mod sanitizer;
pub mod signals;
pub mod watcher;

pub use config::Config;
pub use error::{Error, Result};
pub use sanitizer::{CleanReport, Sanitizer};
pub use watcher::{DirectoryWatcher, WatchEvent};
