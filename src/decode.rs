/// Decodificadores de los campos hexadecimales de `/proc/net/*`.
///
/// El kernel escribe direcciones y puertos en hexadecimal, con las
/// direcciones en el orden de bytes nativo de cada palabra de 32 bits.
/// Estas funciones nunca fallan: una entrada malformada produce un
/// resultado de mejor esfuerzo (ceros o texto sin sentido), porque los
/// datos vienen del kernel y un fallo aquí no es accionable.
use std::fmt;

/// Estado de un socket tal como lo codifica el kernel (`st`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TcpState {
    Established,
    SynSent,
    SynRecv,
    FinWait1,
    FinWait2,
    TimeWait,
    Close,
    CloseWait,
    LastAck,
    Listen,
    Closing,
}

impl TcpState {
    /// Convierte el código de dos dígitos hexadecimales ("01".."0B") en
    /// su estado. Códigos desconocidos devuelven `None`.
    ///
    /// Se aceptan mayúsculas y minúsculas; el kernel usa mayúsculas.
    pub fn from_hex(code: &str) -> Option<Self> {
        let state = match code.to_ascii_uppercase().as_str() {
            "01" => TcpState::Established,
            "02" => TcpState::SynSent,
            "03" => TcpState::SynRecv,
            "04" => TcpState::FinWait1,
            "05" => TcpState::FinWait2,
            "06" => TcpState::TimeWait,
            "07" => TcpState::Close,
            "08" => TcpState::CloseWait,
            "09" => TcpState::LastAck,
            "0A" => TcpState::Listen,
            "0B" => TcpState::Closing,
            _ => return None,
        };
        Some(state)
    }

    /// Nombre simbólico, igual al que muestra `netstat`.
    pub fn as_str(self) -> &'static str {
        match self {
            TcpState::Established => "ESTABLISHED",
            TcpState::SynSent => "SYN_SENT",
            TcpState::SynRecv => "SYN_RECV",
            TcpState::FinWait1 => "FIN_WAIT1",
            TcpState::FinWait2 => "FIN_WAIT2",
            TcpState::TimeWait => "TIME_WAIT",
            TcpState::Close => "CLOSE",
            TcpState::CloseWait => "CLOSE_WAIT",
            TcpState::LastAck => "LAST_ACK",
            TcpState::Listen => "LISTEN",
            TcpState::Closing => "CLOSING",
        }
    }
}

impl fmt::Display for TcpState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Convierte una dirección hexadecimal de `/proc/net` a texto legible.
///
/// - Más de 8 caracteres: IPv6. Se invierten los bytes dentro de cada
///   una de las cuatro palabras de 32 bits y se imprime como 8 grupos
///   de 4 dígitos separados por `:` (sin comprimir).
/// - En otro caso: IPv4. Se invierten los 4 bytes y se imprimen en
///   decimal separados por `.`.
///
/// # Examples
/// ```
/// assert_eq!(portwait::decode::decode_address("0100007F"), "127.0.0.1");
/// ```
pub fn decode_address(hex: &str) -> String {
    // Trabajar por bytes evita cortes a mitad de un carácter UTF-8
    let pairs: Vec<&[u8]> = hex.as_bytes().chunks(2).collect();
    let pair = |i: usize| -> String {
        pairs
            .get(i)
            .map(|p| String::from_utf8_lossy(p).into_owned())
            .unwrap_or_else(|| "00".to_string())
    };

    if hex.len() > 8 {
        let mut groups = Vec::with_capacity(8);
        for word in 0..4 {
            let base = word * 4;
            groups.push(format!("{}{}", pair(base + 3), pair(base + 2)));
            groups.push(format!("{}{}", pair(base + 1), pair(base)));
        }
        return groups.join(":");
    }

    let octet = |i: usize| u8::from_str_radix(&pair(i), 16).unwrap_or(0);
    format!("{}.{}.{}.{}", octet(3), octet(2), octet(1), octet(0))
}

/// Parsea un puerto hexadecimal. Un valor inválido devuelve 0.
pub fn decode_port(hex: &str) -> u16 {
    u16::from_str_radix(hex, 16).unwrap_or(0)
}

/// Separa `DIRECCION:PUERTO` en hexadecimal y decodifica ambas partes.
///
/// Si falta el `:` la dirección se decodifica igual y el puerto es 0.
pub fn decode_endpoint(field: &str) -> (String, u16) {
    match field.split_once(':') {
        Some((addr, port)) => (decode_address(addr), decode_port(port)),
        None => (decode_address(field), 0),
    }
}
