/// Locating the Davis USB serial adapter when no device was configured
use log::debug;
use serialport::{SerialPortInfo, SerialPortType};

use crate::error::StationError;

/// Silicon Labs CP210x bridge used by the Davis data logger, `lsusb` shows 10c4:ea61
pub const DAVIS_USB_VENDOR: u16 = 0x10c4;
pub const DAVIS_USB_PRODUCT: u16 = 0xea61;

pub fn find_usb_device(verbosity: u8) -> Result<String, StationError> {
    let ports = serialport::available_ports().map_err(StationError::PortEnumeration)?;
    select_davis_port(&ports, verbosity)
}

/// Pick the single port whose USB ids match the console. More than one match
/// is refused since the right one cannot be told apart.
pub fn select_davis_port(ports: &[SerialPortInfo], verbosity: u8) -> Result<String, StationError> {
    let matches: Vec<&SerialPortInfo> = ports
        .iter()
        .filter(|port| match &port.port_type {
            SerialPortType::UsbPort(usb) => {
                usb.vid == DAVIS_USB_VENDOR && usb.pid == DAVIS_USB_PRODUCT
            }
            _ => false,
        })
        .collect();

    match matches.as_slice() {
        [] => Err(StationError::DeviceNotFound),
        [port] => {
            if verbosity > 0 {
                debug!("Device found: {} ({:?})", port.port_name, port.port_type);
            }
            Ok(port.port_name.clone())
        }
        many => Err(StationError::DuplicateDevice(
            many.iter()
                .map(|p| p.port_name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        )),
    }
}
