/// Módulo de snapshots de conexiones de red.
///
/// Lee las tablas de `/proc/net`, construye el índice de descriptores
/// y resuelve cada línea al proceso dueño del socket. No hace falta
/// tener `netstat` ni `ss` instalados, pero sin root solo se verán los
/// PIDs de los procesos propios.
use std::fmt;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::decode::TcpState;
use crate::error::Result;
use crate::inode_index::InodeIndex;
use crate::resolver;
use crate::table::{self, Family};

/// Una conexión observada en el momento del snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    /// Usuario dueño del socket ("Unknown" si no se pudo resolver)
    pub user: String,
    /// Nombre del ejecutable en formato título, vacío si no hay PID
    pub name: String,
    /// PID del proceso dueño del socket
    pub pid: Option<u32>,
    /// Ruta del ejecutable (`/proc/<pid>/exe`)
    pub exe: Option<PathBuf>,
    /// Estado del socket; `None` si el código es desconocido
    pub state: Option<TcpState>,
    pub local_address: String,
    pub local_port: u16,
    pub foreign_address: String,
    pub foreign_port: u16,
}

impl Connection {
    /// PID como texto, vacío si no se resolvió.
    pub fn pid_string(&self) -> String {
        self.pid.map(|pid| pid.to_string()).unwrap_or_default()
    }

    /// Estado como texto, vacío si el código era desconocido.
    pub fn state_str(&self) -> &'static str {
        self.state.map(TcpState::as_str).unwrap_or("")
    }

    /// ¿Hay una conexión establecida hacia `port`?
    pub fn is_established_to(&self, port: u16) -> bool {
        self.foreign_port == port && self.state == Some(TcpState::Established)
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} -> {}:{} {} {}/{} ({})",
            self.local_address,
            self.local_port,
            self.foreign_address,
            self.foreign_port,
            self.state_str(),
            self.pid_string(),
            self.name,
            self.user
        )
    }
}

/// Fuente de snapshots. El waiter depende de este trait para poder
/// sustituir `/proc` por datos falsos en las pruebas.
pub trait Snapshot {
    fn snapshot(&self, family: Family) -> Result<Vec<Connection>>;
}

/// Snapshots sobre un sistema de archivos proc real.
#[derive(Debug, Clone)]
pub struct ProcNet {
    root: PathBuf,
}

impl Default for ProcNet {
    fn default() -> Self {
        Self::with_root("/proc")
    }
}

impl ProcNet {
    /// Usa `root` en lugar de `/proc`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Snapshot for ProcNet {
    /// Toma un snapshot completo de `family`.
    ///
    /// Si la tabla no se puede leer se devuelve el error sin resultados
    /// parciales. Las líneas se resuelven en paralelo y el vector
    /// resultante respeta el orden de las líneas de entrada.
    fn snapshot(&self, family: Family) -> Result<Vec<Connection>> {
        let lines = table::read_table(&self.root, family)?;
        let index = InodeIndex::build(&self.root);

        let connections: Vec<Connection> = lines
            .par_iter()
            .map(|line| resolver::resolve(line, &index, &self.root))
            .collect();

        log::debug!(
            "Snapshot {}: {} conexiones, {} descriptores",
            family,
            connections.len(),
            index.len()
        );
        Ok(connections)
    }
}

/// Conexiones TCP/IPv4 del host. Requiere root para ver todos los PIDs.
pub fn tcp() -> Result<Vec<Connection>> {
    ProcNet::default().snapshot(Family::Tcp)
}

/// Conexiones TCP/IPv6 del host.
pub fn tcp6() -> Result<Vec<Connection>> {
    ProcNet::default().snapshot(Family::Tcp6)
}

/// Conexiones UDP/IPv4 del host.
pub fn udp() -> Result<Vec<Connection>> {
    ProcNet::default().snapshot(Family::Udp)
}

/// Conexiones UDP/IPv6 del host.
pub fn udp6() -> Result<Vec<Connection>> {
    ProcNet::default().snapshot(Family::Udp6)
}
