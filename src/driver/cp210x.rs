//! Silicon Labs CP210x codec
//!
//! All requests are vendor requests to interface 0. Multi-byte values are little endian.

use crate::bus::HostBus;
use crate::coding::{ControlLines, FlowControl, Framing};
use crate::error::{expect_len, SerialError};
use crate::pipe::ControlPipe;
use usb_device::control::RequestType;

pub const VENDOR_ID: u16 = 0x10C4;
pub const PRODUCT_ID: u16 = 0xEA60;

pub const IFC_ENABLE: u8 = 0x00;
pub const SET_LINE_CTL: u8 = 0x03;
pub const GET_LINE_CTL: u8 = 0x04;
pub const SET_MHS: u8 = 0x07;
pub const GET_MDMSTS: u8 = 0x08;
pub const SET_FLOW: u8 = 0x13;
pub const GET_BAUDRATE: u8 = 0x1D;
pub const SET_BAUDRATE: u8 = 0x1E;

/// `IFC_ENABLE` value that enables the UART
const UART_ENABLE: u16 = 0x0001;

/// Size of the `SET_FLOW` payload
pub const FLOW_CONTROL_SIZE: usize = 16;

/// Enable the UART interface
pub fn init<B: HostBus>(control: &mut ControlPipe<'_, B>) -> Result<(), SerialError> {
    control.transfer_out(RequestType::Vendor, IFC_ENABLE, UART_ENABLE, &[]);
    Ok(())
}

pub fn set_baud<B: HostBus>(control: &mut ControlPipe<'_, B>, baud: u32) -> Result<(), SerialError> {
    let sent = control.transfer_out(RequestType::Vendor, SET_BAUDRATE, 0, &baud.to_le_bytes());
    expect_len(4, sent)
}

pub fn get_baud<B: HostBus>(control: &mut ControlPipe<'_, B>) -> Result<u32, SerialError> {
    let mut buf = [0u8; 4];
    let received = control.transfer_in(RequestType::Vendor, GET_BAUDRATE, 0, &mut buf);
    expect_len(buf.len(), received)?;
    Ok(u32::from_le_bytes(buf))
}

/// The line control word travels in the setup packet's value field, without data stage.
pub fn set_coding<B: HostBus>(control: &mut ControlPipe<'_, B>, framing: Framing) -> Result<(), SerialError> {
    control.transfer_out(RequestType::Vendor, SET_LINE_CTL, framing.to_bits(), &[]);
    Ok(())
}

pub fn get_coding<B: HostBus>(control: &mut ControlPipe<'_, B>) -> Result<Framing, SerialError> {
    let mut buf = [0u8; 2];
    let received = control.transfer_in(RequestType::Vendor, GET_LINE_CTL, 0, &mut buf);
    expect_len(buf.len(), received)?;
    Framing::from_bits(u16::from_le_bytes(buf)).ok_or(SerialError::InvalidCoding)
}

pub fn set_control_lines<B: HostBus>(_control: &mut ControlPipe<'_, B>, _lines: ControlLines) -> Result<(), SerialError> {
    Err(SerialError::Unsupported)
}

pub fn get_control_lines<B: HostBus>(_control: &mut ControlPipe<'_, B>) -> Result<ControlLines, SerialError> {
    Err(SerialError::Unsupported)
}

/// Only the control handshake byte is set; all other flow control fields are sent as zero.
pub fn set_flow<B: HostBus>(control: &mut ControlPipe<'_, B>, flow: FlowControl) -> Result<(), SerialError> {
    let mut payload = [0u8; FLOW_CONTROL_SIZE];
    payload[0] = flow.bits() as u8;
    let sent = control.transfer_out(RequestType::Vendor, SET_FLOW, 0, &payload);
    expect_len(FLOW_CONTROL_SIZE, sent)
}

pub fn set_break<B: HostBus>(_control: &mut ControlPipe<'_, B>) -> Result<(), SerialError> {
    Err(SerialError::Unsupported)
}

pub fn clear_break<B: HostBus>(_control: &mut ControlPipe<'_, B>) -> Result<(), SerialError> {
    Err(SerialError::Unsupported)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coding::{DataBits, Parity, StopBits};
    use crate::mock::MockBus;
    use crate::types::DeviceAddress;

    fn with_control<R>(bus: &mut MockBus, f: impl FnOnce(&mut ControlPipe<'_, MockBus>) -> R) -> R {
        let mut control = ControlPipe::new(bus, DeviceAddress::new(2).unwrap(), 64);
        f(&mut control)
    }

    #[test]
    fn test_init() {
        let mut bus = MockBus::new();
        assert_eq!(with_control(&mut bus, init), Ok(()));
        let (setup, data) = bus.last_control_out().unwrap();
        assert_eq!(setup.request_type, 0x41);
        assert_eq!(setup.request, IFC_ENABLE);
        assert_eq!(setup.value, 1);
        assert_eq!(setup.length, 0);
        assert!(data.is_empty());
    }

    #[test]
    fn test_baud() {
        let mut bus = MockBus::new();
        assert_eq!(with_control(&mut bus, |c| set_baud(c, 9600)), Ok(()));

        let (setup, data) = bus.last_control_out().unwrap();
        assert_eq!(setup.request, SET_BAUDRATE);
        assert_eq!(setup.length, 4);
        assert_eq!(data, [0x80, 0x25, 0x00, 0x00]);

        assert_eq!(with_control(&mut bus, get_baud), Ok(9600));
        let setup = bus.last_control_in().unwrap();
        assert_eq!(setup.request_type, 0xC1);
        assert_eq!(setup.request, GET_BAUDRATE);
    }

    #[test]
    fn test_coding() {
        let mut bus = MockBus::new();
        let framing = Framing {
            stop_bits: StopBits::One,
            parity: Parity::Even,
            data_bits: DataBits::Eight,
        };
        assert_eq!(with_control(&mut bus, |c| set_coding(c, framing)), Ok(()));

        let (setup, data) = bus.last_control_out().unwrap();
        assert_eq!(setup.request, SET_LINE_CTL);
        assert_eq!(setup.value, 0x0820);
        assert!(data.is_empty());

        assert_eq!(with_control(&mut bus, get_coding), Ok(framing));
    }

    #[test]
    fn test_get_baud_short() {
        let mut bus = MockBus::new();
        bus.respond(GET_BAUDRATE, &[0x80, 0x25]);
        assert_eq!(
            with_control(&mut bus, get_baud),
            Err(SerialError::ShortTransfer { expected: 4, actual: 2 })
        );
    }

    #[test]
    fn test_flow() {
        let mut bus = MockBus::new();
        let flow = FlowControl::DTR_HIGH | FlowControl::CTS_HANDSHAKE;
        assert_eq!(with_control(&mut bus, |c| set_flow(c, flow)), Ok(()));

        let (setup, data) = bus.last_control_out().unwrap();
        assert_eq!(setup.request, SET_FLOW);
        assert_eq!(data.len(), FLOW_CONTROL_SIZE);
        assert_eq!(data[0], 0x09);
        assert!(data[1..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_unsupported() {
        let mut bus = MockBus::new();
        assert_eq!(with_control(&mut bus, |c| set_control_lines(c, ControlLines::DTR)), Err(SerialError::Unsupported));
        assert_eq!(with_control(&mut bus, get_control_lines), Err(SerialError::Unsupported));
        assert_eq!(with_control(&mut bus, set_break), Err(SerialError::Unsupported));
        assert_eq!(with_control(&mut bus, clear_break), Err(SerialError::Unsupported));
        assert!(bus.calls.is_empty());
    }
}
