/// Variables de entorno que controlan el binario.
///
/// El waiter no lee el entorno: este módulo traduce las variables a
/// [`Options`] y decide si la espera debe ejecutarse.
use std::env;
use std::time::Duration;

use crate::waiter::Options;

/// Sobrescribe el intervalo de polling (segundos enteros)
pub const ENV_POLLING_INTERVAL: &str = "TILT_AWAIT_POLLING_INTERVAL";
/// Sobrescribe el puerto a esperar
pub const ENV_PORT: &str = "TILT_AWAIT_PORT_TO_LISTEN";
/// Activa la espera ("true", "1", ...)
pub const ENV_ENABLED: &str = "TILT_AWAIT_DEBUGGER_ENABLED";

/// Valores leídos del entorno. `None` significa "usar el valor por defecto".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub polling_interval: Option<Duration>,
    pub port: Option<u16>,
}

impl EnvOverrides {
    /// Lee las variables del proceso. Un valor que no es un entero
    /// válido se ignora.
    pub fn from_env() -> Self {
        let polling_interval = env::var(ENV_POLLING_INTERVAL)
            .ok()
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let port = env::var(ENV_PORT)
            .ok()
            .and_then(|value| value.trim().parse::<u16>().ok());

        Self {
            polling_interval,
            port,
        }
    }

    /// Aplica los valores presentes sobre `options`.
    pub fn apply(self, mut options: Options) -> Options {
        if let Some(interval) = self.polling_interval {
            options = options.polling_interval(interval);
        }
        if let Some(port) = self.port {
            options = options.port(port);
        }
        options
    }
}

/// ¿Está activada la espera? Variable ausente o no booleana = no.
pub fn is_enabled() -> bool {
    env::var(ENV_ENABLED)
        .ok()
        .and_then(|value| parse_bool(&value))
        .unwrap_or(false)
}

/// Literales aceptados: 1, t, T, TRUE, true, True y sus negativos.
fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}
