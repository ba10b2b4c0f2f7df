//! Salida de consola con el resumen de cada imagen procesada.

use std::path::Path;

use console::style;

use crate::error::Error;
use crate::sanitizer::{CleanReport, TagEntry};

const MAX_DISPLAY_CHARS: usize = 100;

/// Imprime un bloque por archivo procesado, salvo en modo silencioso.
#[derive(Clone, Copy, Debug, Default)]
pub struct Reporter {
    quiet: bool,
}

impl Reporter {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    pub fn print(&self, report: &CleanReport) {
        if !self.quiet {
            println!("{}", self.render(report));
        }
    }

    pub fn print_failure(&self, path: &Path, error: &Error) {
        if !self.quiet {
            eprintln!("{}", self.render_failure(path, error));
        }
    }

    /// Bloque completo para `report`: nombre, metadata previa, lo que queda
    /// tras limpiar y confirmación.
    pub fn render(&self, report: &CleanReport) -> String {
        let mut lines = vec![format!(
            "{} {} {}",
            style("📷 Procesando:").cyan().bold(),
            style(report.file_name()).bold(),
            style(format!("({})", report.format.name())).dim()
        )];

        if report.before.is_empty() {
            lines.push(format!("   {}", style("Sin metadata").dim()));
        } else {
            lines.push(format!("   {}", style("Metadata encontrada:").dim()));
            lines.extend(report.before.iter().map(render_entry));
        }

        if report.written {
            lines.push(format!("   {}", style("Metadata tras la limpieza:").dim()));
            if report.retained.is_empty() {
                lines.push(format!("   {}", style("Sin metadata").dim()));
            } else {
                lines.extend(report.retained.iter().map(render_entry));
            }
        }

        lines.push(render_summary(report));
        lines.join("\n")
    }

    pub fn render_failure(&self, path: &Path, error: &Error) -> String {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        format!(
            "{} {}\n   {}",
            style("✗ No se pudo limpiar:").red().bold(),
            style(name).bold(),
            style(error).red()
        )
    }
}

fn render_entry(entry: &TagEntry) -> String {
    let value = truncate_for_display(&entry.value);
    let marker = if entry.is_sensitive() { "🔒" } else { "  " };
    let line = format!("   {} {}: {}", marker, entry.name, value);

    if is_serial_number(&entry.name) {
        format!("{} {}", style(line).yellow(), style("⚠ número de serie").yellow().bold())
    } else if entry.is_sensitive() {
        style(line).yellow().to_string()
    } else {
        style(line).dim().to_string()
    }
}

fn render_summary(report: &CleanReport) -> String {
    if !report.written {
        return format!(
            "{} {}",
            style("✓").green().bold(),
            style("Sin cambios: no había metadata sensible que eliminar").green()
        );
    }

    let benign_removed = report.removed.len() - report.removed_sensitive();
    format!(
        "{} {}",
        style("✓").green().bold(),
        style(format!(
            "Metadata limpia: {} eliminadas ({} sensibles, {} benignas), {} conservadas",
            report.removed.len(),
            report.removed_sensitive(),
            benign_removed,
            report.retained.len()
        ))
        .green()
    )
}

fn is_serial_number(name: &str) -> bool {
    name.to_lowercase().contains("serial")
}

fn truncate_for_display(value: &str) -> String {
    let single_line = value.replace(['\n', '\r'], " ");
    crate::sanitizer::truncate_chars(&single_line, MAX_DISPLAY_CHARS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sanitizer::{ImageKind, Sensitivity, TagSource};
    use std::path::PathBuf;

    fn entry(name: &str, value: &str, sensitivity: Sensitivity) -> TagEntry {
        TagEntry {
            name: name.to_string(),
            value: value.to_string(),
            source: TagSource::Primary,
            sensitivity,
        }
    }

    fn sample_report() -> CleanReport {
        let make = entry("Make", "Google", Sensitivity::Sensitive);
        let serial = entry("BodySerialNumber", "XJ-1234", Sensitivity::Sensitive);
        let orientation = entry("Orientation", "row 0 at top and column 0 at left", Sensitivity::Benign);
        CleanReport {
            path: PathBuf::from("/fotos/IMG_0001.jpg"),
            format: ImageKind::Jpeg,
            before: vec![make.clone(), serial.clone(), orientation.clone()],
            removed: vec![make, serial],
            retained: vec![orientation],
            written: true,
        }
    }

    fn plain(text: &str) -> String {
        console::strip_ansi_codes(text).into_owned()
    }

    #[test]
    fn block_lists_metadata_and_counts() {
        let rendered = plain(&Reporter::new(false).render(&sample_report()));

        assert!(rendered.starts_with("📷 Procesando: IMG_0001.jpg (JPEG)"));
        assert!(rendered.contains("🔒 Make: Google"));
        assert!(rendered.contains("Orientation: row 0 at top"));
        assert!(!rendered.contains("🔒 Orientation"));
        assert!(rendered.contains("2 eliminadas (2 sensibles, 0 benignas), 1 conservadas"));
    }

    #[test]
    fn retained_entries_are_listed_after_cleaning() {
        let rendered = plain(&Reporter::new(false).render(&sample_report()));
        let (_, after) = rendered
            .split_once("Metadata tras la limpieza:")
            .expect("sección posterior a la limpieza");

        assert!(after.contains("Orientation: row 0 at top"));
        assert!(!after.contains("Make"));
        assert!(!after.contains("BodySerialNumber"));
    }

    #[test]
    fn fully_cleaned_files_show_no_metadata_left() {
        let mut report = sample_report();
        report.removed.extend(report.retained.drain(..));
        let rendered = plain(&Reporter::new(false).render(&report));

        let (_, after) = rendered
            .split_once("Metadata tras la limpieza:")
            .expect("sección posterior a la limpieza");
        assert!(after.contains("Sin metadata"));
        assert!(!after.contains("Orientation"));
    }

    #[test]
    fn serial_numbers_are_marked() {
        let rendered = plain(&Reporter::new(false).render(&sample_report()));
        let serial_line = rendered
            .lines()
            .find(|line| line.contains("BodySerialNumber"))
            .expect("línea del número de serie");
        assert!(serial_line.contains("⚠ número de serie"));
    }

    #[test]
    fn long_values_are_truncated() {
        let mut report = sample_report();
        report.before = vec![entry("UserComment", &"x".repeat(300), Sensitivity::Sensitive)];
        let rendered = plain(&Reporter::new(false).render(&report));

        let line = rendered
            .lines()
            .find(|line| line.contains("UserComment"))
            .expect("línea del comentario");
        assert!(line.ends_with(&format!("{}...", "x".repeat(100))));
    }

    #[test]
    fn untouched_files_say_so() {
        let mut report = sample_report();
        report.before.clear();
        report.removed.clear();
        report.retained.clear();
        report.written = false;

        let rendered = plain(&Reporter::new(false).render(&report));
        assert!(rendered.contains("Sin metadata"));
        assert!(rendered.contains("Sin cambios"));
        assert!(!rendered.contains("Metadata tras la limpieza"));
    }

    #[test]
    fn failures_name_the_file() {
        let path = Path::new("/fotos/roto.png");
        let error = Error::decode(path, "firma PNG inválida");
        let rendered = plain(&Reporter::new(false).render_failure(path, &error));
        assert!(rendered.contains("roto.png"));
        assert!(rendered.contains("firma PNG inválida"));
    }
}
