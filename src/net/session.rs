//! Control-socket session with a saned daemon.

use std::fmt;
use std::net::{IpAddr, Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::auth::{self, PasswordProvider};
use crate::config::ClientConfig;
use crate::error::{Result, SaneError};
use crate::net::device::OpenDevice;
use crate::net::types::Opcode;
use crate::net::wire::{Word, WireReader, WireWriter};

/// Default saned TCP port.
pub const DEFAULT_PORT: u16 = 6566;

/// Protocol version requested during INIT: 1.0.3.
const PROTOCOL_MAJOR: u8 = 1;
const PROTOCOL_MINOR: u8 = 0;
const PROTOCOL_BUILD: u16 = 3;

/// One device as reported by GET_DEVICES. Identity is the `name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaneDeviceInfo {
    pub name: String,
    pub vendor: String,
    pub model: String,
    pub kind: String,
}

/// A connected control-socket session.
///
/// The session owns the TCP control socket for its entire life and performs
/// every RPC as one strict request/reply exchange. It is not safe for
/// concurrent use; callers sharing one across threads must serialize.
pub struct SaneSession {
    stream: TcpStream,
    peer: SocketAddr,
    timeout: Duration,
    password_provider: Option<Box<dyn PasswordProvider>>,
    closed: bool,
}

impl SaneSession {
    /// Connect to a daemon and perform the INIT handshake.
    ///
    /// A zero `timeout` disables socket timeouts; a non-zero timeout that
    /// rounds down to zero milliseconds is clamped to one.
    pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        let timeout = clamp_timeout(timeout);
        let peer = resolve(host, port)?;
        info!("connecting to saned at {peer} (timeout={timeout:?})");

        let stream = if timeout.is_zero() {
            TcpStream::connect(peer)
        } else {
            TcpStream::connect_timeout(&peer, timeout)
        }
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
                SaneError::Timeout(format!("connect to {peer}: {e}"))
            }
            _ => SaneError::ConnectionFailed(format!("connect to {peer}: {e}")),
        })?;

        stream.set_nodelay(true)?;
        let socket_timeout = (!timeout.is_zero()).then_some(timeout);
        stream.set_read_timeout(socket_timeout)?;
        stream.set_write_timeout(socket_timeout)?;

        let mut session = Self {
            stream,
            peer,
            timeout,
            password_provider: None,
            closed: false,
        };
        session.init()?;
        info!("session established with {peer}");
        Ok(session)
    }

    /// Connect using a [`ClientConfig`], installing its credential file as
    /// the password provider when one is configured.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let mut session = Self::connect(&config.host, config.port, config.timeout())?;
        if let Some(path) = &config.password_file {
            session.set_password_provider(auth::CredentialStore::from_file(path)?);
        }
        Ok(session)
    }

    /// Install the source of credentials for authorization requests.
    pub fn set_password_provider(&mut self, provider: impl PasswordProvider + 'static) {
        self.password_provider = Some(Box::new(provider));
    }

    fn init(&mut self) -> Result<()> {
        let username = os_username();
        debug!(%username, "sending INIT");

        let mut request = WireWriter::buffered();
        request.write_i32(Opcode::Init.to_wire())?;
        request.write_word(Word::version(PROTOCOL_MAJOR, PROTOCOL_MINOR, PROTOCOL_BUILD))?;
        request.write_string(&username)?;
        self.send(request.into_bytes())?;

        // Status word and daemon version word; neither changes client
        // behaviour.
        let mut reply = self.reader();
        let status = reply.read_i32()?;
        let version = reply.read_i32()?;
        debug!(status, version, "INIT reply");
        Ok(())
    }

    /// Enumerate the devices the daemon exports. An empty list is legal.
    pub fn list_devices(&mut self) -> Result<Vec<SaneDeviceInfo>> {
        let mut request = WireWriter::buffered();
        request.write_i32(Opcode::GetDevices.to_wire())?;
        self.send(request.into_bytes())?;

        let mut reply = self.reader();
        let status = reply.read_status()?;
        if !status.is_good() {
            return Err(SaneError::from_status("GET_DEVICES", status));
        }

        // The length word counts the terminating null pointer too.
        let length = reply.read_i32()?;
        if length < 1 {
            return Err(SaneError::protocol(format!("device list length {length}")));
        }

        let mut devices = Vec::with_capacity(length as usize - 1);
        for position in 0..length - 1 {
            if !reply.read_pointer()? {
                return Err(SaneError::protocol(format!(
                    "null device pointer at position {position}"
                )));
            }
            devices.push(SaneDeviceInfo {
                name: reply.read_string()?,
                vendor: reply.read_string()?,
                model: reply.read_string()?,
                kind: reply.read_string()?,
            });
        }
        reply.read_word()?; // terminating null pointer

        debug!("daemon reported {} device(s)", devices.len());
        Ok(devices)
    }

    /// Open a device by name, running the authorization dance if the daemon
    /// demands one.
    pub fn open_device(&mut self, name: &str) -> Result<OpenDevice<'_>> {
        let mut request = WireWriter::buffered();
        request.write_i32(Opcode::Open.to_wire())?;
        request.write_string(name)?;
        self.send(request.into_bytes())?;

        loop {
            let (status, handle, resource) = {
                let mut reply = self.reader();
                (reply.read_status()?, reply.read_word()?, reply.read_string()?)
            };
            if !resource.is_empty() {
                self.authorize(&resource)?;
                continue;
            }
            if !status.is_good() {
                return Err(SaneError::from_status("OPEN", status));
            }
            info!(device = name, handle = handle.as_i32(), "device opened");
            return Ok(OpenDevice::new(self, name.to_string(), handle));
        }
    }

    /// Close the session: best-effort EXIT, then guaranteed socket close.
    pub fn close(mut self) -> Result<()> {
        self.shutdown();
        Ok(())
    }

    fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        let mut request = WireWriter::buffered();
        if request.write_i32(Opcode::Exit.to_wire()).is_ok() {
            if let Err(e) = self.send(request.into_bytes()) {
                warn!("EXIT not delivered: {e}");
            }
        }
        let _ = self.stream.shutdown(Shutdown::Both);
        debug!("session closed");
    }

    /// Run the AUTHORIZE sub-protocol for `resource`.
    ///
    /// Fails without transmitting anything when no provider is installed or
    /// the provider has no credential for the resource.
    pub(crate) fn authorize(&mut self, resource: &str) -> Result<()> {
        let provider = self
            .password_provider
            .as_ref()
            .ok_or_else(|| SaneError::auth(format!("no password provider installed for resource {resource}")))?;
        let credential = provider
            .lookup(resource)
            .ok_or_else(|| SaneError::auth(format!("no credential for resource {resource}")))?;

        debug!(resource, username = %credential.username, "authorizing");
        let password = auth::encode_password(resource, &credential.password);

        let mut request = WireWriter::buffered();
        request.write_i32(Opcode::Authorize.to_wire())?;
        request.write_string(resource)?;
        request.write_string(&credential.username)?;
        request.write_string(&password)?;
        self.send(request.into_bytes())?;

        // One dummy word acknowledges the exchange; the interrupted reply
        // then resumes from its beginning.
        self.reader().read_word()?;
        Ok(())
    }

    /// RPC that sends an opcode plus handle and reads one status word.
    pub(crate) fn handle_rpc(&mut self, opcode: Opcode, handle: Word, operation: &'static str) -> Result<()> {
        let mut request = WireWriter::buffered();
        request.write_i32(opcode.to_wire())?;
        request.write_word(handle)?;
        self.send(request.into_bytes())?;

        let status = self.reader().read_status()?;
        if !status.is_good() {
            return Err(SaneError::from_status(operation, status));
        }
        Ok(())
    }

    pub(crate) fn send(&mut self, bytes: Vec<u8>) -> Result<()> {
        use std::io::Write;
        (&self.stream).write_all(&bytes)?;
        Ok(())
    }

    pub(crate) fn reader(&self) -> WireReader<&TcpStream> {
        WireReader::new(&self.stream)
    }

    pub(crate) fn peer_ip(&self) -> IpAddr {
        self.peer.ip()
    }

    pub(crate) fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Drop for SaneSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for SaneSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaneSession")
            .field("peer", &self.peer)
            .field("timeout", &self.timeout)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()
        .map_err(|e| SaneError::ConnectionFailed(format!("cannot resolve {host}:{port}: {e}")))?
        .next()
        .ok_or_else(|| SaneError::ConnectionFailed(format!("no address for {host}:{port}")))
}

fn os_username() -> String {
    std::env::var("USER")
        .ok()
        .filter(|user| !user.is_empty())
        .or_else(|| std::env::var("USERNAME").ok().filter(|user| !user.is_empty()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// A non-zero timeout below one millisecond would round to zero on the
/// socket API and mean "no timeout"; clamp it to one millisecond instead.
fn clamp_timeout(timeout: Duration) -> Duration {
    if !timeout.is_zero() && timeout.as_millis() == 0 {
        warn!(?timeout, "timeout rounds to zero milliseconds, clamping to 1ms");
        return Duration::from_millis(1);
    }
    timeout
}

/// Outcome of a connection probe. See [`SaneSession::diagnose`].
#[derive(Debug, Clone)]
pub struct ConnectionDiagnosis {
    /// Whether the TCP port was reachable.
    pub tcp_reachable: bool,
    /// Time until the probe finished (ms).
    pub tcp_connect_ms: u64,
    /// TCP-level error if any.
    pub tcp_error: Option<String>,
    /// Whether the INIT handshake succeeded.
    pub protocol_ok: bool,
    /// Protocol-level error if any.
    pub protocol_error: Option<String>,
}

impl SaneSession {
    /// Probe a daemon without keeping the session: TCP reachability first,
    /// then the INIT handshake, then a clean EXIT.
    pub fn diagnose(host: &str, port: u16, timeout: Duration) -> ConnectionDiagnosis {
        let start = Instant::now();
        let outcome = Self::connect(host, port, timeout);
        let tcp_connect_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(session) => {
                drop(session);
                ConnectionDiagnosis {
                    tcp_reachable: true,
                    tcp_connect_ms,
                    tcp_error: None,
                    protocol_ok: true,
                    protocol_error: None,
                }
            }
            Err(e @ (SaneError::ConnectionFailed(_) | SaneError::Timeout(_))) => ConnectionDiagnosis {
                tcp_reachable: false,
                tcp_connect_ms,
                tcp_error: Some(e.to_string()),
                protocol_ok: false,
                protocol_error: None,
            },
            Err(e) => ConnectionDiagnosis {
                tcp_reachable: true,
                tcp_connect_ms,
                tcp_error: None,
                protocol_ok: false,
                protocol_error: Some(e.to_string()),
            },
        }
    }
}

impl fmt::Display for ConnectionDiagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Connection Diagnosis ===")?;
        writeln!(f, "TCP Reachable: {}", self.tcp_reachable)?;
        writeln!(f, "Probe Time: {}ms", self.tcp_connect_ms)?;
        if let Some(ref err) = self.tcp_error {
            writeln!(f, "TCP Error: {err}")?;
        }
        if self.tcp_reachable {
            writeln!(f, "Protocol OK: {}", self.protocol_ok)?;
            if let Some(ref err) = self.protocol_error {
                writeln!(f, "Protocol Error: {err}")?;
            }
        }
        Ok(())
    }
}
