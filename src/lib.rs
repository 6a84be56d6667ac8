//! # portwait ⏳
//!
//! Inspecciona la tabla de conexiones de Linux (`/proc/net/*`), resuelve
//! cada socket al proceso que lo posee y permite bloquear hasta que
//! algún proceso se conecte a un puerto dado.
//!
//! ## Uso
//! ```no_run
//! use std::time::Duration;
//! use portwait::{Family, Options};
//!
//! portwait::start(
//!     Options::new()
//!         .port(40000)
//!         .family(Family::Tcp)
//!         .polling_interval(Duration::from_secs(1))
//!         .logger(|args| log::info!("{args}")),
//! )?;
//! # Ok::<(), portwait::Error>(())
//! ```

pub mod decode;
pub mod env;
pub mod error;
pub mod inode_index;
pub mod port_scanner;
pub mod resolver;
pub mod table;
pub mod waiter;

pub use decode::TcpState;
pub use error::{Error, Result};
pub use port_scanner::{tcp, tcp6, udp, udp6, Connection, ProcNet, Snapshot};
pub use table::Family;
pub use waiter::{start, CancelToken, Config, Options, Waiter};
