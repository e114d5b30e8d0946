//! ELM327 serial adapter
//!
//! Talks the ELM327 AT-command dialect over a serial port. The adapter is
//! initialised once (`ATZ`, echo/linefeeds/spaces/headers off, automatic
//! protocol), then each request is written as hex text and the reply is read
//! up to the `>` prompt.
//!
//! Serial I/O is blocking and runs on the blocking thread pool; the port
//! lives behind a mutex so only one request is ever in flight.

use std::io::{Read, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serialport::SerialPort;
use tracing::{debug, info, trace, warn};

use super::{ConnectionStatus, TransportAdapter, TransportError};
use crate::config::Elm327Config;

/// Baud rates tried in order when none is configured
pub const BAUD_RATES: [u32; 5] = [38400, 9600, 115200, 230400, 500000];

/// Prompt the adapter prints when it is ready for the next command
const PROMPT: u8 = b'>';

/// Timeout for AT commands during initialisation
const INIT_TIMEOUT: Duration = Duration::from_secs(2);

/// `ATZ` resets the chip, which takes noticeably longer
const RESET_TIMEOUT: Duration = Duration::from_secs(5);

/// Adapter replies that mean "no response from the vehicle"
const NO_RESPONSE_MARKERS: [&str; 9] = [
    "NO DATA",
    "?",
    "UNABLE TO CONNECT",
    "CAN ERROR",
    "BUS ERROR",
    "BUS BUSY",
    "DATA ERROR",
    "STOPPED",
    "ERROR",
];

struct Link {
    port: Box<dyn SerialPort>,
    /// Header currently programmed with `ATSH`
    header: Option<String>,
}

/// ELM327 adapter on a serial port
pub struct Elm327Adapter {
    link: Arc<Mutex<Option<Link>>>,
    port_name: String,
    protocol: String,
    status: RwLock<ConnectionStatus>,
}

impl Elm327Adapter {
    /// Find the adapter, initialise it and negotiate a bus protocol
    pub async fn connect(config: &Elm327Config) -> Result<Self, TransportError> {
        let config = config.clone();
        tokio::task::spawn_blocking(move || Self::connect_blocking(&config))
            .await
            .map_err(|e| TransportError::Adapter(e.to_string()))?
    }

    fn connect_blocking(config: &Elm327Config) -> Result<Self, TransportError> {
        let ports = if config.is_auto() {
            available_ports()
        } else {
            vec![config.port.clone()]
        };
        if ports.is_empty() {
            return Err(TransportError::ConnectionFailed(
                "no serial ports found".to_string(),
            ));
        }

        let bauds: Vec<u32> = match config.baud_rate {
            Some(baud) => vec![baud],
            None => BAUD_RATES.to_vec(),
        };

        let mut last_error = None;
        for name in &ports {
            for &baud in &bauds {
                debug!(port = %name, baud, "Probing for ELM327");
                match Self::open(name, baud) {
                    Ok(adapter) => return Ok(adapter),
                    Err(e) => {
                        trace!(port = %name, baud, error = %e, "Probe failed");
                        last_error = Some(e);
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            TransportError::ConnectionFailed("adapter not found or not responding".to_string())
        }))
    }

    fn open(name: &str, baud: u32) -> Result<Self, TransportError> {
        let mut port = serialport::new(name, baud)
            .timeout(Duration::from_millis(100))
            .open()?;

        let reset = command(port.as_mut(), "ATZ", RESET_TIMEOUT)?;
        if !reset.iter().any(|l| l.contains("ELM")) {
            return Err(TransportError::ConnectionFailed(format!(
                "{} @ {}: no ELM327 banner",
                name, baud
            )));
        }

        for at in ["ATE0", "ATL0", "ATS0", "ATH0", "ATSP0"] {
            let reply = command(port.as_mut(), at, INIT_TIMEOUT)?;
            if !reply.iter().any(|l| l.contains("OK")) {
                return Err(TransportError::ConnectionFailed(format!(
                    "{} rejected: {:?}",
                    at, reply
                )));
            }
        }

        let mut status = ConnectionStatus::ElmConnected;

        // The first service 01 request triggers the protocol search
        let probe = command(port.as_mut(), "0100", Duration::from_secs(10))?;
        let car_answered = matches!(parse_response(&probe), Ok(data) if !data.is_empty());

        let dpn = command(port.as_mut(), "ATDPN", INIT_TIMEOUT)?;
        let protocol = dpn
            .first()
            .and_then(|code| protocol_name(code))
            .unwrap_or("unknown")
            .to_string();

        if protocol != "unknown" {
            status = ConnectionStatus::ObdConnected;
            if car_answered {
                status = ConnectionStatus::CarConnected;
            }
        }

        info!(port = %name, baud, %protocol, %status, "ELM327 connected");

        Ok(Self {
            link: Arc::new(Mutex::new(Some(Link { port, header: None }))),
            port_name: name.to_string(),
            protocol,
            status: RwLock::new(status),
        })
    }

    fn exchange_blocking(
        link: &Mutex<Option<Link>>,
        header: &str,
        request: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        let mut guard = link.lock();
        let link = guard.as_mut().ok_or(TransportError::ConnectionClosed)?;

        if link.header.as_deref() != Some(header) {
            let reply = command(link.port.as_mut(), &format!("ATSH{}", header), INIT_TIMEOUT)?;
            if !reply.iter().any(|l| l.contains("OK")) {
                return Err(TransportError::SendFailed(format!(
                    "header {} rejected: {:?}",
                    header, reply
                )));
            }
            link.header = Some(header.to_string());
        }

        let text = hex::encode_upper(request);
        let lines = command(link.port.as_mut(), &text, timeout)?;
        parse_response(&lines)
    }
}

#[async_trait]
impl TransportAdapter for Elm327Adapter {
    async fn send_receive(
        &self,
        header: &str,
        request: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        let link = Arc::clone(&self.link);
        let header = header.to_string();
        let request = request.to_vec();

        tokio::task::spawn_blocking(move || {
            Self::exchange_blocking(&link, &header, &request, timeout)
        })
        .await
        .map_err(|e| TransportError::Adapter(e.to_string()))?
    }

    fn status(&self) -> ConnectionStatus {
        *self.status.read()
    }

    fn port_name(&self) -> String {
        self.port_name.clone()
    }

    fn protocol_name(&self) -> String {
        self.protocol.clone()
    }

    async fn close(&self) {
        let link = Arc::clone(&self.link);
        let closed = tokio::task::spawn_blocking(move || {
            if let Some(mut link) = link.lock().take() {
                // Leave the chip in a clean state for the next user
                let _ = command(link.port.as_mut(), "ATPC", INIT_TIMEOUT);
            }
        })
        .await;
        if let Err(e) = closed {
            warn!(error = %e, "Closing ELM327 port failed");
        }
        *self.status.write() = ConnectionStatus::NotConnected;
        debug!(port = %self.port_name, "ELM327 closed");
    }
}

/// Serial ports worth probing, USB adapters first
fn available_ports() -> Vec<String> {
    let mut names: Vec<String> = serialport::available_ports()
        .unwrap_or_default()
        .into_iter()
        .map(|p| p.port_name)
        .collect();
    names.sort_by_key(|name| port_sort_key(name));
    names.dedup();
    names
}

fn port_sort_key(name: &str) -> (u8, usize, String) {
    let basename = name.rsplit('/').next().unwrap_or(name);
    for (rank, prefix) in [(0, "ttyUSB"), (1, "rfcomm"), (2, "ttyACM")] {
        if let Some(rest) = basename.strip_prefix(prefix) {
            let num = rest.parse::<usize>().unwrap_or(usize::MAX);
            return (rank, num, basename.to_string());
        }
    }
    (3, 0, basename.to_string())
}

/// Write one command and collect the reply lines up to the prompt
fn command(
    port: &mut dyn SerialPort,
    cmd: &str,
    timeout: Duration,
) -> Result<Vec<String>, TransportError> {
    trace!(cmd, "ELM327 write");
    port.write_all(format!("{}\r", cmd).as_bytes())
        .map_err(|e| TransportError::SendFailed(e.to_string()))?;
    port.flush()
        .map_err(|e| TransportError::SendFailed(e.to_string()))?;

    let deadline = Instant::now() + timeout;
    let mut buffer = [0u8; 64];
    let mut response = Vec::new();

    loop {
        match port.read(&mut buffer) {
            Ok(0) => return Err(TransportError::ConnectionClosed),
            Ok(n) => {
                response.extend_from_slice(&buffer[..n]);
                if response.contains(&PROMPT) {
                    break;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {}
            Err(e) => return Err(e.into()),
        }
        if Instant::now() > deadline {
            return Err(TransportError::Timeout(format!(
                "no prompt after '{}' within {:?}",
                cmd, timeout
            )));
        }
    }

    let text = String::from_utf8_lossy(&response);
    let lines = split_lines(&text, cmd);
    trace!(cmd, ?lines, "ELM327 read");
    Ok(lines)
}

/// Split raw adapter output into trimmed lines, dropping echo and prompt
fn split_lines(text: &str, cmd: &str) -> Vec<String> {
    text.split(['\r', '\n'])
        .map(|line| line.trim().trim_end_matches('>').trim())
        .filter(|line| !line.is_empty() && *line != cmd && *line != "SEARCHING...")
        .map(str::to_string)
        .collect()
}

/// Turn the reply lines for a data request into response bytes
///
/// Adapter error replies yield an empty response. ISO-TP multi-frame replies
/// (a byte-count line followed by `0:`, `1:`, ... frames) are reassembled;
/// otherwise the first responding line is used.
pub fn parse_response(lines: &[String]) -> Result<Vec<u8>, TransportError> {
    if lines.is_empty()
        || lines.iter().any(|line| {
            let upper = line.to_ascii_uppercase();
            NO_RESPONSE_MARKERS.iter().any(|m| upper.contains(m))
        })
    {
        return Ok(Vec::new());
    }

    let compact: Vec<String> = lines.iter().map(|l| l.replace(' ', "")).collect();

    let is_frame = |line: &str| {
        line.split_once(':')
            .map(|(idx, _)| !idx.is_empty() && idx.chars().all(|c| c.is_ascii_hexdigit()))
            .unwrap_or(false)
    };

    if compact.iter().any(|l| is_frame(l)) {
        let length = compact
            .iter()
            .find(|l| !is_frame(l))
            .and_then(|l| usize::from_str_radix(l, 16).ok());

        let mut data = Vec::new();
        for frame in compact.iter().filter(|l| is_frame(l)) {
            if let Some((_, payload)) = frame.split_once(':') {
                data.extend(decode_hex_line(payload)?);
            }
        }
        if let Some(length) = length {
            data.truncate(length);
        }
        return Ok(data);
    }

    decode_hex_line(&compact[0])
}

fn decode_hex_line(line: &str) -> Result<Vec<u8>, TransportError> {
    hex::decode(line)
        .map_err(|e| TransportError::ReceiveFailed(format!("malformed reply '{}': {}", line, e)))
}

/// Protocol name for an `ATDPN` reply ("A6" = automatic, protocol 6)
pub fn protocol_name(dpn: &str) -> Option<&'static str> {
    let dpn = dpn.trim().to_ascii_uppercase();
    let code = match dpn.len() {
        2 => dpn.strip_prefix('A').unwrap_or(&dpn),
        _ => dpn.as_str(),
    };
    let name = match code {
        "1" => "SAE J1850 PWM",
        "2" => "SAE J1850 VPW",
        "3" => "ISO 9141-2",
        "4" => "ISO 14230-4 (KWP 5BAUD)",
        "5" => "ISO 14230-4 (KWP FAST)",
        "6" => "ISO 15765-4 (CAN 11/500)",
        "7" => "ISO 15765-4 (CAN 29/500)",
        "8" => "ISO 15765-4 (CAN 11/250)",
        "9" => "ISO 15765-4 (CAN 29/250)",
        "A" => "SAE J1939 (CAN 29/250)",
        _ => return None,
    };
    Some(name)
}
