//! Manejo de SIGINT/SIGTERM para detener la vigilancia de forma ordenada.
//!
//! El bucle del vigilante consulta la bandera entre eventos; nunca se
//! interrumpe una limpieza en curso.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use signal_hook::consts::{SIGINT, SIGTERM};
use tracing::warn;

/// Bandera de parada compartida entre los manejadores de señales y el bucle.
#[derive(Clone, Debug, Default)]
pub struct ShutdownSignal {
    flag: Arc<AtomicBool>,
}

impl ShutdownSignal {
    /// Crea la bandera y registra SIGINT y SIGTERM sobre ella.
    ///
    /// Un registro fallido solo se avisa; Ctrl+C seguiría terminando el proceso
    /// con el comportamiento por defecto.
    pub fn install() -> Self {
        let signal = Self::detached();
        for (name, number) in [("SIGINT", SIGINT), ("SIGTERM", SIGTERM)] {
            if let Err(err) = signal_hook::flag::register(number, Arc::clone(&signal.flag)) {
                warn!(signal = name, error = %err, "No se pudo registrar la señal");
            }
        }
        signal
    }

    /// Bandera sin señales asociadas; solo se activa con [`request`](Self::request).
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_is_visible_through_clones() {
        let signal = ShutdownSignal::detached();
        let clone = signal.clone();
        assert!(!clone.is_requested());

        signal.request();
        assert!(clone.is_requested());
    }
}
