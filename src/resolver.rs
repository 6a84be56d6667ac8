/// Resolución de una línea cruda de `/proc/net/*` a un [`Connection`].
///
/// Cada campo se resuelve por separado y con mejor esfuerzo: si falla
/// el PID, el ejecutable o el usuario, ese campo queda vacío (o
/// "Unknown") pero el registro se construye igual.
use std::path::{Path, PathBuf};

use nix::unistd::{Uid, User};
use procfs::process::Process;

use crate::decode::{decode_endpoint, TcpState};
use crate::inode_index::InodeIndex;
use crate::port_scanner::Connection;

/// Usuario asignado cuando el uid no existe en la base del sistema.
pub const UNKNOWN_USER: &str = "Unknown";

// Posiciones fijas de las columnas del kernel (tras quitar espacios)
const FIELD_LOCAL: usize = 1;
const FIELD_FOREIGN: usize = 2;
const FIELD_STATE: usize = 3;
const FIELD_UID: usize = 7;
const FIELD_INODE: usize = 9;

/// Convierte una línea cruda en un registro de conexión.
///
/// # Arguments
/// * `line` - Línea de datos de `/proc/net/<familia>`
/// * `index` - Índice de descriptores del mismo snapshot
/// * `proc_root` - Raíz de proc, para leer `<pid>/exe`
pub fn resolve(line: &str, index: &InodeIndex, proc_root: &Path) -> Connection {
    let fields = split_fields(line);
    if fields.len() <= FIELD_INODE {
        log::warn!("Línea de conexión incompleta ({} campos): {:?}", fields.len(), line);
    }
    let field = |i: usize| fields.get(i).copied().unwrap_or("");

    let (local_address, local_port) = decode_endpoint(field(FIELD_LOCAL));
    let (foreign_address, foreign_port) = decode_endpoint(field(FIELD_FOREIGN));
    let state = TcpState::from_hex(field(FIELD_STATE));

    let pid = index.find_pid(field(FIELD_INODE));
    let exe = pid.and_then(|pid| process_exe(proc_root, pid));
    let name = exe.as_deref().map(process_name).unwrap_or_default();

    log::trace!(
        "{}:{} -> {}:{} inodo={} pid={:?}",
        local_address,
        local_port,
        foreign_address,
        foreign_port,
        field(FIELD_INODE),
        pid
    );

    Connection {
        user: lookup_user(field(FIELD_UID)),
        name,
        pid,
        exe,
        state,
        local_address,
        local_port,
        foreign_address,
        foreign_port,
    }
}

/// Divide una línea en campos descartando los vacíos.
///
/// El kernel rellena las columnas con una cantidad variable de
/// espacios, así que varios separadores seguidos cuentan como uno.
pub fn split_fields(line: &str) -> Vec<&str> {
    line.split(char::is_whitespace)
        .filter(|token| !token.is_empty())
        .collect()
}

/// Lee `<proc_root>/<pid>/exe`. `None` si el proceso ya no existe o no
/// hay permisos.
fn process_exe(proc_root: &Path, pid: u32) -> Option<PathBuf> {
    Process::new_with_root(proc_root.join(pid.to_string()))
        .and_then(|process| process.exe())
        .ok()
}

/// Nombre visible del proceso: último segmento de la ruta, en formato
/// título ("/usr/bin/example" -> "Example").
pub fn process_name(exe: &Path) -> String {
    let base = exe
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    title_case(&base)
}

/// Formato título al estilo de las reglas de palabra de Unicode.
///
/// - `_`, los dígitos y las letras sin caja son parte de la palabra
///   pero no consumen la mayúscula: `__debug_bin` -> `__Debug_bin`,
///   `3proxy` -> `3Proxy`.
/// - Un solo `.`, `'` o `:` entre letras no corta la palabra
///   (`libfoo.so` -> `Libfoo.so`); dos seguidos sí.
/// - Cualquier otro carácter (`-`, espacios...) empieza palabra nueva.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut need_upper = true;
    let mut prev_mid = false;
    for c in text.chars() {
        if c.is_alphanumeric() || c == '_' {
            let cased = c.is_lowercase() || c.is_uppercase();
            if cased && need_upper {
                out.extend(c.to_uppercase());
                need_upper = false;
            } else if cased {
                out.extend(c.to_lowercase());
            } else {
                out.push(c);
            }
            prev_mid = false;
        } else if is_mid_word(c) && !prev_mid {
            out.push(c);
            prev_mid = true;
        } else {
            out.push(c);
            need_upper = true;
            prev_mid = false;
        }
    }
    out
}

fn is_mid_word(c: char) -> bool {
    matches!(c, '.' | '\'' | ':' | '\u{2019}' | '\u{00B7}')
}

/// Traduce un uid numérico a nombre de usuario, o `"Unknown"`.
pub fn lookup_user(uid: &str) -> String {
    uid.parse::<u32>()
        .ok()
        .and_then(|raw| User::from_uid(Uid::from_raw(raw)).ok().flatten())
        .map(|user| user.name)
        .unwrap_or_else(|| UNKNOWN_USER.to_string())
}
