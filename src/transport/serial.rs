//! Serial port access.

use crate::error::{GameError, SettingsError, TransportError, TransportErrorKind};
use crate::settings::PortSettings;
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::{info, instrument};

/// Opens the port named by `settings` as 8N1 at its configured baud rate.
///
/// Must be called from within a tokio runtime.
#[instrument(skip(settings), fields(port = ?settings.port_name(), baud = settings.baud_rate()))]
pub fn open_serial(settings: &PortSettings) -> Result<SerialStream, GameError> {
    let port = match settings.port_name() {
        Some(port) if settings.is_all_set() => port,
        _ => return Err(SettingsError::new("Port name and baud rate must be set").into()),
    };

    let stream = tokio_serial::new(port, settings.baud_rate())
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .open_native_async()
        .map_err(|e| TransportError::new(TransportErrorKind::Io, format!("{}: {}", port, e)))?;

    info!(port, baud = settings.baud_rate(), "Serial port opened");
    Ok(stream)
}

/// Names of the serial ports present on this machine.
#[instrument]
pub fn available_ports() -> Result<Vec<String>, TransportError> {
    let ports = tokio_serial::available_ports().map_err(|e| {
        TransportError::new(TransportErrorKind::Io, format!("Cannot list ports: {}", e))
    })?;
    Ok(ports.into_iter().map(|info| info.port_name).collect())
}
