/// Errores de portwait.
///
/// Solo dos situaciones se propagan como error real: pedir una familia
/// de conexión desconocida y no poder leer la tabla de `/proc/net`.
/// Todo lo demás (PID, ejecutable, usuario) se degrada a un valor vacío
/// en el registro correspondiente.
use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// La familia pedida no es ninguna de tcp, tcp6, udp, udp6.
    #[error("tipo de conexión no soportado: {0}")]
    UnsupportedFamily(String),

    /// No se pudo leer la tabla de conexiones del kernel.
    #[error("no se pudo leer {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// La espera fue cancelada desde fuera.
    #[error("espera cancelada")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;
