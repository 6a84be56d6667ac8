/// Índice de descriptores de archivo de todos los procesos.
///
/// Para cada `/proc/<pid>/fd/<fd>` guarda el destino del enlace
/// simbólico. En los sockets ese destino es `socket:[<inodo>]`, que es
/// lo que permite unir una línea de `/proc/net/*` (sin PID) con el
/// proceso que la posee.
///
/// El escaneo es inherentemente racy: un proceso puede terminar o
/// cerrar el descriptor entre el glob y la lectura del enlace. Esas
/// entradas simplemente se descartan.
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

/// Un descriptor y el destino de su enlace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InodeEntry {
    pub path: PathBuf,
    pub link: String,
}

/// Índice inmutable, construido una vez por snapshot.
#[derive(Debug, Clone, Default)]
pub struct InodeIndex {
    entries: Vec<InodeEntry>,
}

impl InodeIndex {
    /// Enumera `<proc_root>/[0-9]*/fd/[0-9]*` y lee cada enlace en paralelo.
    ///
    /// Nunca falla: un patrón inválido o una raíz ilegible producen un
    /// índice vacío, y los enlaces ilegibles (permisos, proceso ya
    /// terminado) se omiten.
    pub fn build(proc_root: &Path) -> Self {
        // La raíz puede contener metacaracteres de glob ([, *, ?)
        let root = glob::Pattern::escape(&proc_root.to_string_lossy());
        let pattern = Path::new(&root).join("[0-9]*").join("fd").join("[0-9]*");
        let pattern = pattern.to_string_lossy();
        let paths: Vec<PathBuf> = match glob::glob(&pattern) {
            Ok(found) => found.filter_map(|entry| entry.ok()).collect(),
            Err(err) => {
                log::warn!("Patrón de descriptores inválido {}: {}", pattern, err);
                Vec::new()
            }
        };

        let entries: Vec<InodeEntry> = paths
            .into_par_iter()
            .filter_map(|path| {
                let link = fs::read_link(&path).ok()?;
                Some(InodeEntry {
                    link: link.to_string_lossy().into_owned(),
                    path,
                })
            })
            .collect();

        log::debug!("Índice de descriptores: {} entradas", entries.len());
        Self { entries }
    }

    /// Construye un índice a partir de entradas ya conocidas.
    pub fn from_entries(entries: Vec<InodeEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[InodeEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Busca el PID dueño del socket con este inodo.
    ///
    /// Conserva la coincidencia histórica por subcadena: una entrada
    /// coincide si su enlace *contiene* el texto del inodo, y si hay
    /// varias gana la última.
    ///
    /// Única diferencia con esa regla histórica: el inodo `0` (socket
    /// sin enlazar) y el texto vacío nunca coinciden, porque casarían
    /// con casi cualquier enlace y atribuirían el socket a un proceso
    /// al azar.
    ///
    /// # Returns
    /// `Some(pid)` tomado del segmento `<pid>` de la ruta, o `None`.
    pub fn find_pid(&self, inode: &str) -> Option<u32> {
        if inode.is_empty() || inode == "0" {
            return None;
        }

        self.entries
            .iter()
            .filter(|entry| entry.link.contains(inode))
            .filter_map(|entry| pid_from_fd_path(&entry.path))
            .last()
    }
}

/// Extrae `<pid>` de una ruta `<raiz>/<pid>/fd/<fd>`.
fn pid_from_fd_path(path: &Path) -> Option<u32> {
    let fd_dir = path.parent()?;
    if fd_dir.file_name()? != "fd" {
        return None;
    }
    fd_dir.parent()?.file_name()?.to_str()?.parse().ok()
}
