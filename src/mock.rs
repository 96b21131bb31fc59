//! Test doubles: a recording host controller, a recording handler, and a configuration descriptor builder

extern crate std;

use std::vec::Vec;

use crate::bus::HostBus;
use crate::descriptor::{self, DeviceDescriptor};
use crate::handler::{CallbackData, SerialEvent, SerialHandler};
use crate::instance::InstanceHandle;
use crate::types::{Bcd16, DeviceAddress, EventEntry, PipeId, PipeKind, SetupPacket};
use fugit::MillisDurationU32;

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Call {
    RegisterClassDriver(u8),
    AllocPipe { kind: PipeKind, pipe: PipeId, max_packet_size: u16, entry: EventEntry },
    ConfigurePipe { pipe: PipeId, max_packet_size: u16, interval: u32, endpoint_number: u8 },
    FreePipe(PipeId),
    ScheduleWrite(PipeId, Vec<u8>),
    ScheduleRead(PipeId),
    Read(PipeId, usize),
    ControlIn(SetupPacket),
    ControlOut(SetupPacket, Vec<u8>),
}

/// Host controller that records every call, and emulates a device's configuration registers.
///
/// Data written with a SET request can be read back with the matching GET request.
pub struct MockBus {
    pub calls: Vec<Call>,
    /// Number of pipes that can still be allocated
    pub pipes_left: usize,
    next_pipe: u8,
    pending: Vec<(PipeId, Vec<u8>)>,
    registers: Vec<(u8, Vec<u8>)>,
}

const REQUEST_TYPE_VENDOR: u8 = 2 << 5;

/// GET request that reads back what the given SET request wrote
fn readback(request: u8) -> Option<u8> {
    match request {
        // CDC SET_LINE_CODING -> GET_LINE_CODING
        0x20 => Some(0x21),
        // CP210x SET_BAUDRATE -> GET_BAUDRATE
        0x1E => Some(0x1D),
        _ => None,
    }
}

impl MockBus {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            pipes_left: 16,
            next_pipe: 1,
            pending: Vec::new(),
            registers: Vec::new(),
        }
    }

    /// Answer the given GET request with `data`
    pub fn respond(&mut self, request: u8, data: &[u8]) {
        self.registers.retain(|(r, _)| *r != request);
        self.registers.push((request, data.to_vec()));
    }

    /// Make data available on a pipe
    pub fn push_data(&mut self, pipe: PipeId, data: &[u8]) {
        self.pending.push((pipe, data.to_vec()));
    }

    pub fn last_control_out(&self) -> Option<(SetupPacket, Vec<u8>)> {
        self.calls.iter().rev().find_map(|call| match call {
            Call::ControlOut(setup, data) => Some((*setup, data.clone())),
            _ => None,
        })
    }

    pub fn last_control_in(&self) -> Option<SetupPacket> {
        self.calls.iter().rev().find_map(|call| match call {
            Call::ControlIn(setup) => Some(*setup),
            _ => None,
        })
    }

    pub fn freed(&self) -> Vec<PipeId> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::FreePipe(pipe) => Some(*pipe),
                _ => None,
            })
            .collect()
    }

    pub fn allocated(&self) -> Vec<(PipeKind, PipeId)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::AllocPipe { kind, pipe, .. } => Some((*kind, *pipe)),
                _ => None,
            })
            .collect()
    }
}

impl HostBus for MockBus {
    fn register_class_driver(&mut self, interface_class: u8) {
        self.calls.push(Call::RegisterClassDriver(interface_class));
    }

    fn alloc_pipe(&mut self, kind: PipeKind, _device: DeviceAddress, max_packet_size: u16, entry: EventEntry) -> Option<PipeId> {
        if self.pipes_left == 0 {
            return None;
        }
        self.pipes_left -= 1;
        let pipe = PipeId(self.next_pipe);
        self.next_pipe += 1;
        self.calls.push(Call::AllocPipe { kind, pipe, max_packet_size, entry });
        Some(pipe)
    }

    fn configure_pipe(&mut self, pipe: PipeId, max_packet_size: u16, interval: MillisDurationU32, endpoint_number: u8) {
        self.calls.push(Call::ConfigurePipe { pipe, max_packet_size, interval: interval.ticks(), endpoint_number });
    }

    fn free_pipe(&mut self, pipe: PipeId) {
        self.calls.push(Call::FreePipe(pipe));
    }

    fn schedule_write(&mut self, pipe: PipeId, data: &[u8]) -> usize {
        self.calls.push(Call::ScheduleWrite(pipe, data.to_vec()));
        data.len()
    }

    fn schedule_read(&mut self, pipe: PipeId) {
        self.calls.push(Call::ScheduleRead(pipe));
    }

    fn available(&self, pipe: PipeId) -> u16 {
        self.pending
            .iter()
            .find(|(p, _)| *p == pipe)
            .map(|(_, data)| data.len() as u16)
            .unwrap_or(0)
    }

    fn read(&mut self, pipe: PipeId, buf: &mut [u8]) -> usize {
        let len = match self.pending.iter().position(|(p, _)| *p == pipe) {
            Some(index) => {
                let (_, data) = self.pending.remove(index);
                let len = data.len().min(buf.len());
                buf[..len].copy_from_slice(&data[..len]);
                len
            }
            None => 0,
        };
        self.calls.push(Call::Read(pipe, len));
        len
    }

    fn control_in(&mut self, _device: DeviceAddress, setup: SetupPacket, buf: &mut [u8], _max_packet_size: u8) -> usize {
        self.calls.push(Call::ControlIn(setup));
        match self.registers.iter().find(|(r, _)| *r == setup.request) {
            Some((_, data)) => {
                let len = data.len().min(buf.len());
                buf[..len].copy_from_slice(&data[..len]);
                len
            }
            None => 0,
        }
    }

    fn control_out(&mut self, _device: DeviceAddress, setup: SetupPacket, data: &[u8], _max_packet_size: u8) -> usize {
        self.calls.push(Call::ControlOut(setup, data.to_vec()));
        if setup.request_type & 0x60 == REQUEST_TYPE_VENDOR && setup.request == 0x03 {
            // CP210x SET_LINE_CTL carries its value in the setup packet
            self.respond(0x04, &setup.value.to_le_bytes());
        } else if let Some(get) = readback(setup.request) {
            self.respond(get, data);
        }
        data.len()
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Event {
    Connected,
    Disconnected,
    RxAvailable(PipeKind, Vec<u8>),
    TxComplete,
    UnknownConnected,
    PowerFault,
}

impl From<SerialEvent<'_>> for Event {
    fn from(event: SerialEvent<'_>) -> Self {
        match event {
            SerialEvent::Connected => Event::Connected,
            SerialEvent::Disconnected => Event::Disconnected,
            SerialEvent::RxAvailable { pipe, data } => Event::RxAvailable(pipe, data.to_vec()),
            SerialEvent::TxComplete => Event::TxComplete,
            SerialEvent::UnknownConnected => Event::UnknownConnected,
            SerialEvent::PowerFault => Event::PowerFault,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Recorded {
    Global(Option<InstanceHandle>, Event),
    Instance(InstanceHandle, Event, CallbackData),
}

/// Handler that records all events it receives
#[derive(Default)]
pub struct RecordingHandler {
    pub events: Vec<Recorded>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SerialHandler for RecordingHandler {
    fn global_event(&mut self, instance: Option<InstanceHandle>, event: SerialEvent<'_>) {
        self.events.push(Recorded::Global(instance, event.into()));
    }

    fn instance_event(&mut self, instance: InstanceHandle, event: SerialEvent<'_>, data: CallbackData) {
        self.events.push(Recorded::Instance(instance, event.into(), data));
    }
}

#[derive(Copy, Clone, Debug)]
pub struct EndpointSpec {
    address: u8,
    attributes: u8,
    max_packet_size: u16,
    interval: u8,
}

impl EndpointSpec {
    pub const fn bulk_in(number: u8, max_packet_size: u16) -> Self {
        Self { address: 0x80 | number, attributes: 2, max_packet_size, interval: 0 }
    }

    pub const fn bulk_out(number: u8, max_packet_size: u16) -> Self {
        Self { address: number, attributes: 2, max_packet_size, interval: 0 }
    }

    pub const fn interrupt_in(number: u8, max_packet_size: u16, interval: u8) -> Self {
        Self { address: 0x80 | number, attributes: 3, max_packet_size, interval }
    }

    pub const fn interrupt_out(number: u8, max_packet_size: u16, interval: u8) -> Self {
        Self { address: number, attributes: 3, max_packet_size, interval }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct InterfaceSpec<'e> {
    class: u8,
    endpoints: &'e [EndpointSpec],
}

impl<'e> InterfaceSpec<'e> {
    pub const fn new(class: u8, endpoints: &'e [EndpointSpec]) -> Self {
        Self { class, endpoints }
    }
}

/// Build a configuration descriptor (with nested interface and endpoint descriptors).
///
/// Interfaces are numbered in order, starting at 0.
pub fn configuration(interfaces: &[InterfaceSpec<'_>]) -> Vec<u8> {
    let mut data = std::vec![
        9, descriptor::TYPE_CONFIGURATION,
        0, 0, // total length, filled in below
        interfaces.len() as u8,
        1, // value
        0, // string index
        0x80, // attributes
        50, // max power
    ];
    for (number, interface) in interfaces.iter().enumerate() {
        data.extend_from_slice(&[
            9, descriptor::TYPE_INTERFACE,
            number as u8,
            0, // alternate setting
            interface.endpoints.len() as u8,
            interface.class,
            0, 0, 0,
        ]);
        for endpoint in interface.endpoints {
            let max_packet_size = endpoint.max_packet_size.to_le_bytes();
            data.extend_from_slice(&[
                7, descriptor::TYPE_ENDPOINT,
                endpoint.address,
                endpoint.attributes,
                max_packet_size[0], max_packet_size[1],
                endpoint.interval,
            ]);
        }
    }
    let total_length = (data.len() as u16).to_le_bytes();
    data[2] = total_length[0];
    data[3] = total_length[1];
    data
}

pub fn device_descriptor(id_vendor: u16, id_product: u16) -> DeviceDescriptor {
    DeviceDescriptor {
        usb_release: Bcd16(0x0200),
        device_class: 0,
        device_sub_class: 0,
        device_protocol: 0,
        max_packet_size: 64,
        id_vendor,
        id_product,
        device_release: Bcd16(0x0100),
        manufacturer_index: 0,
        product_index: 0,
        serial_number_index: 0,
        num_configurations: 1,
    }
}
