// Byte-oriented serial transport shared by the command writers and the polling loop

use serialport::SerialPort;
use std::io::{Read, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, error, info};

use super::roboteq::{Result, RoboteqError};

/// Default serial configuration for Roboteq controllers
pub const DEFAULT_BAUDRATE: u32 = 115_200;
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Contract the driver needs from the wire
pub trait Transport: Send {
    fn is_open(&self) -> bool;

    /// Write every byte and flush before returning
    fn write_all(&mut self, bytes: &[u8]) -> Result<()>;

    /// Number of bytes that can be read without blocking
    fn bytes_available(&mut self) -> Result<usize>;

    /// Read whatever is currently buffered
    fn read_available(&mut self) -> Result<Vec<u8>>;

    fn close(&mut self);
}

/// Serial port backed transport. A port that failed to open stays closed.
pub struct SerialTransport {
    port: Option<Box<dyn SerialPort>>,
}

impl SerialTransport {
    pub fn open(port_name: &str, baudrate: u32) -> Result<Self> {
        let port = serialport::new(port_name, baudrate)
            .timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
            .open()?;

        Ok(Self { port: Some(port) })
    }

    /// Open the port, falling back to a closed handle when the device is absent
    pub fn open_or_closed(port_name: &str, baudrate: u32) -> Self {
        match Self::open(port_name, baudrate) {
            Ok(transport) => {
                info!("Serial port {} initialized at {} baud", port_name, baudrate);
                transport
            }
            Err(e) => {
                error!("Unable to open port {}: {}", port_name, e);
                Self::closed()
            }
        }
    }

    pub fn closed() -> Self {
        Self { port: None }
    }

    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        self.port.as_mut().ok_or(RoboteqError::PortClosed)
    }
}

impl Transport for SerialTransport {
    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let port = self.port()?;
        port.write_all(bytes)?;
        port.flush()?;
        Ok(())
    }

    fn bytes_available(&mut self) -> Result<usize> {
        match self.port.as_mut() {
            Some(port) => Ok(port.bytes_to_read()? as usize),
            None => Ok(0),
        }
    }

    fn read_available(&mut self) -> Result<Vec<u8>> {
        let available = self.bytes_available()?;
        if available == 0 {
            return Ok(Vec::new());
        }

        let port = self.port()?;
        let mut buffer = vec![0u8; available];
        let read = port.read(&mut buffer)?;
        buffer.truncate(read);
        Ok(buffer)
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            info!("Serial port closed");
        }
    }
}

/// One transport handle shared between writers and the polling loop.
///
/// Every access goes through the mutex, so command bytes from concurrent
/// requests never interleave on the wire.
#[derive(Clone)]
pub struct SharedTransport {
    inner: Arc<Mutex<Box<dyn Transport>>>,
}

impl SharedTransport {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(transport))),
        }
    }

    /// Exclusive access for multi-step exchanges (write then read back)
    pub fn lock(&self) -> MutexGuard<'_, Box<dyn Transport>> {
        // A panicked writer cannot leave the port half-written at this layer
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write_str(&self, command: &str) -> Result<()> {
        debug!("Serial write: {:?}", command);
        self.lock().write_all(command.as_bytes())
    }

    pub fn is_open(&self) -> bool {
        self.lock().is_open()
    }

    pub fn close(&self) {
        self.lock().close();
    }
}
