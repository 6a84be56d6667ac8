//! # portwait ⏳
//!
//! Bloquea el arranque hasta que algún proceso se conecte al puerto
//! configurado (por defecto el 40000, el del depurador remoto).
//!
//! ## Variables de entorno
//! - `TILT_AWAIT_DEBUGGER_ENABLED`: activa la espera; sin ella el binario sale enseguida
//! - `TILT_AWAIT_POLLING_INTERVAL`: segundos entre comprobaciones (5)
//! - `TILT_AWAIT_PORT_TO_LISTEN`: puerto remoto a esperar (40000)
//!
//! ## Uso
//! `portwait [tcp|tcp6|udp|udp6]`

use std::process::ExitCode;
use std::str::FromStr;

use portwait::env::{self, EnvOverrides};
use portwait::{Family, Options};

fn main() -> ExitCode {
    // Inicializar logging (nivel INFO por defecto, configurable con RUST_LOG)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    if !env::is_enabled() {
        log::info!("{} no está activado, se omite la espera", env::ENV_ENABLED);
        return ExitCode::SUCCESS;
    }

    let family = match std::env::args().nth(1) {
        Some(name) => match Family::from_str(&name) {
            Ok(family) => family,
            Err(e) => {
                log::error!("{}", e);
                return ExitCode::from(2);
            }
        },
        None => Family::default(),
    };

    log::info!("⏳ portwait v{} iniciando...", env!("CARGO_PKG_VERSION"));

    let options = EnvOverrides::from_env()
        .apply(Options::new())
        .family(family)
        .logger(|args| log::info!("{}", args));

    match portwait::start(options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("La espera terminó con error: {}", e);
            ExitCode::FAILURE
        }
    }
}
