//! Eliminación de metadata sensible de imágenes conservando los píxeles.

mod clean;
mod format;
mod jpeg;
mod png;
mod policy;
mod tags;
mod webp;
mod write;

pub use clean::{CleanReport, Sanitizer};
pub use format::ImageKind;
pub use policy::{Sensitivity, TagPolicy};
pub use tags::{TagEntry, TagSource};
pub(crate) use tags::truncate_chars;
pub use write::TEMP_PREFIX;
