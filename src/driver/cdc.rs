//! CDC Abstract Control Model codec
//!
//! Baud rate and framing share the 7 byte line coding structure. Changing one of them reads the current
//! line coding from the device, patches the affected bytes, and writes the result back.

use crate::bus::HostBus;
use crate::coding::{ControlLines, FlowControl, Framing, LineCoding};
use crate::error::{expect_len, SerialError};
use crate::pipe::ControlPipe;
use usb_device::control::RequestType;

pub const SET_LINE_CODING: u8 = 0x20;
pub const GET_LINE_CODING: u8 = 0x21;
pub const SET_CONTROL_LINE_STATE: u8 = 0x22;

/// `SET_CONTROL_LINE_STATE` value: DTR and RTS both asserted
const LINES_ASSERTED: u16 = 0x03;

/// CDC devices need no initialization beyond enumeration
pub fn init<B: HostBus>(_control: &mut ControlPipe<'_, B>) -> Result<(), SerialError> {
    Ok(())
}

fn read_line_coding<B: HostBus>(control: &mut ControlPipe<'_, B>) -> Result<[u8; LineCoding::SIZE], SerialError> {
    let mut buf = [0u8; LineCoding::SIZE];
    let received = control.transfer_in(RequestType::Class, GET_LINE_CODING, 0, &mut buf);
    expect_len(LineCoding::SIZE, received)?;
    Ok(buf)
}

fn write_line_coding<B: HostBus>(control: &mut ControlPipe<'_, B>, data: &[u8; LineCoding::SIZE]) -> Result<(), SerialError> {
    let sent = control.transfer_out(RequestType::Class, SET_LINE_CODING, 0, data);
    expect_len(LineCoding::SIZE, sent)
}

/// Read the line coding, let `patch` modify it, then write it back
fn modify_line_coding<B: HostBus>(control: &mut ControlPipe<'_, B>, patch: impl FnOnce(&mut [u8; LineCoding::SIZE])) -> Result<(), SerialError> {
    let mut data = read_line_coding(control)?;
    patch(&mut data);
    write_line_coding(control, &data)
}

/// Fetch and decode the full line coding
pub fn get_line_coding<B: HostBus>(control: &mut ControlPipe<'_, B>) -> Result<LineCoding, SerialError> {
    let data = read_line_coding(control)?;
    LineCoding::from_bytes(&data).ok_or(SerialError::InvalidCoding)
}

pub fn set_baud<B: HostBus>(control: &mut ControlPipe<'_, B>, baud: u32) -> Result<(), SerialError> {
    modify_line_coding(control, |data| data[..4].copy_from_slice(&baud.to_le_bytes()))
}

pub fn get_baud<B: HostBus>(control: &mut ControlPipe<'_, B>) -> Result<u32, SerialError> {
    let data = read_line_coding(control)?;
    Ok(u32::from_le_bytes([data[0], data[1], data[2], data[3]]))
}

pub fn set_coding<B: HostBus>(control: &mut ControlPipe<'_, B>, framing: Framing) -> Result<(), SerialError> {
    modify_line_coding(control, |data| {
        data[4] = framing.stop_bits as u8;
        data[5] = framing.parity as u8;
        data[6] = framing.data_bits as u8;
    })
}

pub fn get_coding<B: HostBus>(control: &mut ControlPipe<'_, B>) -> Result<Framing, SerialError> {
    get_line_coding(control).map(|coding| coding.framing)
}

/// Assert DTR and RTS if either of them is requested, otherwise release both.
pub fn set_control_lines<B: HostBus>(control: &mut ControlPipe<'_, B>, lines: ControlLines) -> Result<(), SerialError> {
    let value = if lines.intersects(ControlLines::DTR | ControlLines::RTS) {
        LINES_ASSERTED
    } else {
        0
    };
    control.transfer_out(RequestType::Class, SET_CONTROL_LINE_STATE, value, &[]);
    Ok(())
}

pub fn get_control_lines<B: HostBus>(_control: &mut ControlPipe<'_, B>) -> Result<ControlLines, SerialError> {
    Err(SerialError::Unsupported)
}

pub fn set_flow<B: HostBus>(_control: &mut ControlPipe<'_, B>, _flow: FlowControl) -> Result<(), SerialError> {
    Err(SerialError::Unsupported)
}

pub fn set_break<B: HostBus>(_control: &mut ControlPipe<'_, B>) -> Result<(), SerialError> {
    Err(SerialError::Unsupported)
}

pub fn clear_break<B: HostBus>(_control: &mut ControlPipe<'_, B>) -> Result<(), SerialError> {
    Err(SerialError::Unsupported)
}
