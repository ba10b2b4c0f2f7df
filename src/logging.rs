//! Configuración del suscriptor de `tracing`.

use tracing_subscriber::EnvFilter;

/// Instala el suscriptor global escribiendo en stderr.
///
/// `RUST_LOG` tiene prioridad sobre `default_level`. Llamarlo dos veces no
/// falla; la segunda instalación se ignora.
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
