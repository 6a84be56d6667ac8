/// Lector de las tablas de conexiones del kernel (`/proc/net/*`).
///
/// Cada familia tiene su propio archivo. El formato es una línea de
/// cabecera, N líneas de datos y una línea vacía final; este módulo
/// solo quita ese marco y devuelve las líneas crudas.
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Error, Result};

pub const TCP: &str = "tcp";
pub const TCP6: &str = "tcp6";
pub const UDP: &str = "udp";
pub const UDP6: &str = "udp6";

/// Nombres de familia aceptados, en el orden de `Family::ALL`.
pub const ALLOWED_FAMILIES: [&str; 4] = [TCP, TCP6, UDP, UDP6];

/// Familia de conexión a observar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Family {
    #[default]
    Tcp,
    Tcp6,
    Udp,
    Udp6,
}

impl Family {
    pub const ALL: [Family; 4] = [Family::Tcp, Family::Tcp6, Family::Udp, Family::Udp6];

    /// Nombre del archivo dentro de `<proc>/net/`.
    pub fn as_str(self) -> &'static str {
        match self {
            Family::Tcp => TCP,
            Family::Tcp6 => TCP6,
            Family::Udp => UDP,
            Family::Udp6 => UDP6,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Family {
    type Err = Error;

    /// Acepta los nombres de archivo (`tcp`, `tcp6`, ...) y los alias
    /// largos (`ipv4-tcp`, `ipv6-udp`, ...).
    fn from_str(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "tcp" | "ipv4-tcp" => Ok(Family::Tcp),
            "tcp6" | "ipv6-tcp" => Ok(Family::Tcp6),
            "udp" | "ipv4-udp" => Ok(Family::Udp),
            "udp6" | "ipv6-udp" => Ok(Family::Udp6),
            _ => Err(Error::UnsupportedFamily(name.to_string())),
        }
    }
}

/// Lee la tabla de `family` bajo `proc_root` y devuelve las líneas de datos.
///
/// # Arguments
/// * `proc_root` - Raíz del sistema de archivos proc (normalmente `/proc`)
/// * `family` - Familia de conexión a leer
///
/// # Returns
/// Las líneas crudas sin cabecera ni línea vacía final, o
/// `Error::Io` si el archivo no se puede leer.
pub fn read_table(proc_root: &Path, family: Family) -> Result<Vec<String>> {
    let path = proc_root.join("net").join(family.as_str());
    let data = fs::read_to_string(&path).map_err(|source| Error::Io {
        path: path.clone(),
        source,
    })?;

    let lines = strip_framing(&data);
    log::trace!("{}: {} líneas de datos", path.display(), lines.len());
    Ok(lines)
}

/// Variante por nombre de `read_table`.
///
/// Valida el nombre antes de tocar el sistema de archivos: una familia
/// desconocida devuelve `Error::UnsupportedFamily` sin leer nada.
pub fn read_table_named(proc_root: &Path, family: &str) -> Result<Vec<String>> {
    let family = Family::from_str(family)?;
    read_table(proc_root, family)
}

/// Quita la cabecera y las líneas en blanco (incluida la final).
fn strip_framing(data: &str) -> Vec<String> {
    data.lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}
