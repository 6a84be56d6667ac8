/// Espera a que algún proceso se conecte a un puerto.
///
/// El waiter es una máquina de dos estados (`Polling` -> `Done`): en
/// cada tick toma un snapshot de la familia configurada y termina con
/// éxito en cuanto ve una conexión ESTABLISHED cuyo puerto remoto es el
/// buscado. Un error leyendo la tabla termina la espera sin reintentos.
/// No hay límite de intentos ni timeout; la única otra salida es un
/// [`CancelToken`].
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::port_scanner::{ProcNet, Snapshot};
use crate::table::Family;

/// Intervalo entre snapshots por defecto
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(5);
/// Puerto remoto que se espera por defecto
pub const DEFAULT_PORT: u16 = 40000;

/// Callback de formato para los mensajes del waiter.
pub type LogSink = Arc<dyn Fn(fmt::Arguments<'_>) + Send + Sync>;

// ─────────────────────────────────────────────────────────────
// Configuración
// ─────────────────────────────────────────────────────────────

/// Configuración inmutable de una espera.
#[derive(Clone)]
pub struct Config {
    pub polling_interval: Duration,
    pub port: u16,
    pub family: Family,
    pub logger: Option<LogSink>,
    pub cancel: Option<CancelToken>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            polling_interval: DEFAULT_POLLING_INTERVAL,
            port: DEFAULT_PORT,
            family: Family::Tcp,
            logger: None,
            cancel: None,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("polling_interval", &self.polling_interval)
            .field("port", &self.port)
            .field("family", &self.family)
            .field("logger", &self.logger.is_some())
            .field("cancel", &self.cancel)
            .finish()
    }
}

impl Config {
    fn log(&self, args: fmt::Arguments<'_>) {
        if let Some(logger) = &self.logger {
            logger(args);
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }
}

/// Builder de [`Config`]. Cada opción se aplica en orden sobre los
/// valores por defecto; si una opción se repite gana la última.
#[derive(Clone, Debug, Default)]
pub struct Options {
    config: Config,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intervalo entre snapshots.
    pub fn polling_interval(mut self, interval: Duration) -> Self {
        self.config.polling_interval = interval;
        self
    }

    /// Puerto remoto a esperar.
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Familia de conexión a observar.
    pub fn family(mut self, family: Family) -> Self {
        self.config.family = family;
        self
    }

    /// Usa `printf` para los mensajes de progreso. Por defecto el
    /// waiter no emite nada por este canal.
    pub fn logger<F>(mut self, printf: F) -> Self
    where
        F: Fn(fmt::Arguments<'_>) + Send + Sync + 'static,
    {
        self.config.logger = Some(Arc::new(printf));
        self
    }

    /// Permite cancelar la espera desde otro hilo.
    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.config.cancel = Some(token);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

// ─────────────────────────────────────────────────────────────
// Cancelación y espera entre ticks
// ─────────────────────────────────────────────────────────────

/// Señal de cancelación compartida entre hilos.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marca la espera como cancelada y despierta al waiter si está
    /// dormido entre ticks.
    pub fn cancel(&self) {
        let (lock, cvar) = &*self.inner;
        *lock.lock().unwrap_or_else(PoisonError::into_inner) = true;
        cvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Duerme hasta `timeout` o hasta que se cancele.
    ///
    /// # Returns
    /// `true` si el token está cancelado al despertar.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (cancelled, _) = cvar
            .wait_timeout_while(guard, timeout, |cancelled| !*cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        *cancelled
    }
}

/// Suspensión entre ticks. Las pruebas lo sustituyen por un contador.
pub trait Sleeper {
    /// Devuelve `true` si la espera fue interrumpida por cancelación.
    fn sleep(&self, interval: Duration, cancel: Option<&CancelToken>) -> bool;
}

/// Duerme el hilo actual (o espera sobre el token si hay uno).
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, interval: Duration, cancel: Option<&CancelToken>) -> bool {
        match cancel {
            Some(token) => token.wait_timeout(interval),
            None => {
                thread::sleep(interval);
                false
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────
// Máquina de estados
// ─────────────────────────────────────────────────────────────

enum State {
    Polling,
    Done(Result<()>),
}

/// Bucle de polling sobre una fuente de snapshots.
pub struct Waiter<S, Z> {
    config: Config,
    source: S,
    sleeper: Z,
}

impl<S: Snapshot, Z: Sleeper> Waiter<S, Z> {
    pub fn new(config: Config, source: S, sleeper: Z) -> Self {
        Self {
            config,
            source,
            sleeper,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Ejecuta ticks hasta encontrar la conexión, fallar la lectura o
    /// ser cancelado.
    pub fn run(&self) -> Result<()> {
        let port = self.config.port;
        self.config
            .log(format_args!("Starting await process in port {port} ..."));

        let mut state = State::Polling;
        let mut ticks: u64 = 0;
        loop {
            state = match state {
                State::Polling => {
                    ticks += 1;
                    log::debug!("Tick {} esperando el puerto {}", ticks, port);
                    self.tick()
                }
                State::Done(result) => return result,
            };
        }
    }

    fn tick(&self) -> State {
        let config = &self.config;
        if config.is_cancelled() {
            return State::Done(Err(Error::Cancelled));
        }

        let connections = match self.source.snapshot(config.family) {
            Ok(connections) => connections,
            Err(err) => {
                config.log(format_args!("error getting connections: {err}"));
                return State::Done(Err(err));
            }
        };

        if connections.iter().any(|c| c.is_established_to(config.port)) {
            config.log(format_args!(
                "new connection detected in port {}, exit from await",
                config.port
            ));
            return State::Done(Ok(()));
        }

        config.log(format_args!(
            "no connections to port {}, retrying in {:?}",
            config.port, config.polling_interval
        ));
        if self
            .sleeper
            .sleep(config.polling_interval, config.cancel.as_ref())
        {
            return State::Done(Err(Error::Cancelled));
        }
        State::Polling
    }
}

/// Espera sobre el `/proc` real hasta que algún proceso se conecte al
/// puerto configurado. Solo funciona en Linux.
pub fn start(options: Options) -> Result<()> {
    Waiter::new(options.build(), ProcNet::default(), ThreadSleeper).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::TcpState;
    use crate::port_scanner::Connection;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::io;
    use std::path::PathBuf;
    use std::time::Instant;

    fn conn(foreign_port: u16, state: TcpState) -> Connection {
        Connection {
            user: "Unknown".to_string(),
            name: String::new(),
            pid: None,
            exe: None,
            state: Some(state),
            local_address: "127.0.0.1".to_string(),
            local_port: 45490,
            foreign_address: "127.0.0.1".to_string(),
            foreign_port,
        }
    }

    /// Devuelve los resultados programados y luego vectores vacíos
    #[derive(Default)]
    struct ScriptedSource {
        script: RefCell<VecDeque<Result<Vec<Connection>>>>,
        calls: Cell<usize>,
        families: RefCell<Vec<Family>>,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<Vec<Connection>>>) -> Self {
            Self {
                script: RefCell::new(script.into()),
                ..Self::default()
            }
        }
    }

    impl Snapshot for &ScriptedSource {
        fn snapshot(&self, family: Family) -> Result<Vec<Connection>> {
            self.calls.set(self.calls.get() + 1);
            self.families.borrow_mut().push(family);
            self.script.borrow_mut().pop_front().unwrap_or(Ok(Vec::new()))
        }
    }

    /// Cuenta las esperas; cancela al llegar a `cancel_after`
    #[derive(Default)]
    struct CountingSleeper {
        sleeps: RefCell<Vec<Duration>>,
        cancel_after: Option<usize>,
    }

    impl Sleeper for &CountingSleeper {
        fn sleep(&self, interval: Duration, _cancel: Option<&CancelToken>) -> bool {
            let mut sleeps = self.sleeps.borrow_mut();
            sleeps.push(interval);
            self.cancel_after.is_some_and(|n| sleeps.len() >= n)
        }
    }

    fn io_error() -> Error {
        Error::Io {
            path: PathBuf::from("/proc/net/tcp"),
            source: io::Error::from(io::ErrorKind::NotFound),
        }
    }

    #[test]
    fn test_default_config() {
        let config = Options::new().build();
        assert_eq!(config.polling_interval, Duration::from_secs(5));
        assert_eq!(config.port, 40000);
        assert_eq!(config.family, Family::Tcp);
        assert!(config.logger.is_none());
        assert!(config.cancel.is_none());
    }

    /// Las opciones se aplican en orden: gana la última
    #[test]
    fn test_options_last_wins() {
        let config = Options::new()
            .port(8080)
            .family(Family::Udp)
            .port(9229)
            .polling_interval(Duration::from_millis(250))
            .build();
        assert_eq!(config.port, 9229);
        assert_eq!(config.family, Family::Udp);
        assert_eq!(config.polling_interval, Duration::from_millis(250));
    }

    /// Termina en el primer tick con coincidencia, sin dormir
    #[test]
    fn test_success_on_first_tick() {
        let source = ScriptedSource::new(vec![Ok(vec![conn(40000, TcpState::Established)])]);
        let sleeper = CountingSleeper::default();

        let result = Waiter::new(Options::new().build(), &source, &sleeper).run();
        assert!(result.is_ok());
        assert_eq!(source.calls.get(), 1);
        assert!(sleeper.sleeps.borrow().is_empty());
    }

    /// Reintenta al intervalo configurado hasta ver la conexión
    #[test]
    fn test_success_after_retries() {
        let source = ScriptedSource::new(vec![
            Ok(vec![]),
            Ok(vec![conn(40000, TcpState::Listen), conn(8080, TcpState::Established)]),
            Ok(vec![conn(40000, TcpState::SynSent)]),
            Ok(vec![conn(22, TcpState::Established), conn(40000, TcpState::Established)]),
            Ok(vec![conn(40000, TcpState::Established)]),
        ]);
        let sleeper = CountingSleeper::default();
        let config = Options::new()
            .polling_interval(Duration::from_secs(2))
            .build();

        Waiter::new(config, &source, &sleeper).run().unwrap();
        assert_eq!(source.calls.get(), 4);
        assert_eq!(*sleeper.sleeps.borrow(), vec![Duration::from_secs(2); 3]);
    }

    /// Un error de lectura es fatal y no se reintenta
    #[test]
    fn test_read_error_is_fatal() {
        let source = ScriptedSource::new(vec![
            Ok(vec![]),
            Err(io_error()),
            Ok(vec![conn(40000, TcpState::Established)]),
        ]);
        let sleeper = CountingSleeper::default();

        let result = Waiter::new(Options::new().build(), &source, &sleeper).run();
        assert!(matches!(result, Err(Error::Io { .. })));
        assert_eq!(source.calls.get(), 2);
        assert_eq!(sleeper.sleeps.borrow().len(), 1);
    }

    /// Sin coincidencias sigue haciendo ticks indefinidamente
    #[test]
    fn test_keeps_polling_without_match() {
        let source = ScriptedSource::default();
        let sleeper = CountingSleeper {
            cancel_after: Some(50),
            ..CountingSleeper::default()
        };

        let result = Waiter::new(Options::new().build(), &source, &sleeper).run();
        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(source.calls.get(), 50);
        assert_eq!(sleeper.sleeps.borrow().len(), 50);
    }

    #[test]
    fn test_uses_configured_family_and_port() {
        let source = ScriptedSource::new(vec![
            Ok(vec![conn(40000, TcpState::Established)]),
            Ok(vec![conn(5005, TcpState::Established)]),
        ]);
        let sleeper = CountingSleeper::default();
        let config = Options::new().family(Family::Tcp6).port(5005).build();

        Waiter::new(config, &source, &sleeper).run().unwrap();
        assert_eq!(*source.families.borrow(), vec![Family::Tcp6, Family::Tcp6]);
    }

    /// El sink recibe los mensajes de inicio, progreso y fin
    #[test]
    fn test_logger_receives_progress() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&lines);
        let config = Options::new()
            .port(9229)
            .polling_interval(Duration::from_secs(1))
            .logger(move |args| sink.lock().unwrap().push(args.to_string()))
            .build();
        let source = ScriptedSource::new(vec![
            Ok(vec![]),
            Ok(vec![conn(9229, TcpState::Established)]),
        ]);
        let sleeper = CountingSleeper::default();

        Waiter::new(config, &source, &sleeper).run().unwrap();
        assert_eq!(
            *lines.lock().unwrap(),
            vec![
                "Starting await process in port 9229 ...",
                "no connections to port 9229, retrying in 1s",
                "new connection detected in port 9229, exit from await",
            ]
        );
    }

    #[test]
    fn test_cancelled_before_first_tick() {
        let token = CancelToken::new();
        token.cancel();
        let source = ScriptedSource::default();
        let sleeper = CountingSleeper::default();
        let config = Options::new().cancel_token(token).build();

        let result = Waiter::new(config, &source, &sleeper).run();
        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(source.calls.get(), 0);
    }

    /// Cancelar desde otro hilo despierta al sleeper real
    #[test]
    fn test_thread_sleeper_wakes_on_cancel() {
        let token = CancelToken::new();
        let remote = token.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.cancel();
        });

        let started = Instant::now();
        assert!(ThreadSleeper.sleep(Duration::from_secs(60), Some(&token)));
        assert!(started.elapsed() < Duration::from_secs(30));
        handle.join().unwrap();
    }

    #[test]
    fn test_thread_sleeper_times_out() {
        let token = CancelToken::new();
        assert!(!ThreadSleeper.sleep(Duration::from_millis(5), Some(&token)));
        assert!(!ThreadSleeper.sleep(Duration::from_millis(5), None));
    }
}
