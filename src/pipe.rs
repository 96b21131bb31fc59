use usb_device::{UsbDirection, control::{Recipient, RequestType}};
use crate::bus::HostBus;
use crate::types::{DeviceAddress, SetupPacket};

/// Interface number that all serial class requests are addressed to.
///
/// The supported adapters expose a single serial port, which is controlled through interface 0.
pub const INTERFACE: u16 = 0;

/// Default control pipe of one device
///
/// All requests go to the interface recipient, with index [`INTERFACE`]. Transfers are blocking: they return
/// once the host controller has finished the status stage.
pub struct ControlPipe<'b, B> {
    bus: &'b mut B,
    device_address: DeviceAddress,
    max_packet_size: u8,
}

impl<'b, B: HostBus> ControlPipe<'b, B> {
    pub fn new(bus: &'b mut B, device_address: DeviceAddress, max_packet_size: u8) -> Self {
        Self { bus, device_address, max_packet_size }
    }

    pub fn device_address(&self) -> DeviceAddress {
        self.device_address
    }

    /// Issue a request with an IN data stage of `buf.len()` bytes. Returns the number of bytes received.
    pub fn transfer_in(&mut self, request_type: RequestType, request: u8, value: u16, buf: &mut [u8]) -> usize {
        let setup = SetupPacket::new(
            UsbDirection::In,
            request_type,
            Recipient::Interface,
            request,
            value,
            INTERFACE,
            buf.len() as u16,
        );
        trace!("[usbh-serial] control IN {:#X} to device {}", request, u8::from(self.device_address));
        self.bus.control_in(self.device_address, setup, buf, self.max_packet_size)
    }

    /// Issue a request with an OUT data stage (empty `data` means no data stage). Returns the number of bytes sent.
    pub fn transfer_out(&mut self, request_type: RequestType, request: u8, value: u16, data: &[u8]) -> usize {
        let setup = SetupPacket::new(
            UsbDirection::Out,
            request_type,
            Recipient::Interface,
            request,
            value,
            INTERFACE,
            data.len() as u16,
        );
        trace!("[usbh-serial] control OUT {:#X} to device {}", request, u8::from(self.device_address));
        self.bus.control_out(self.device_address, setup, data, self.max_packet_size)
    }
}
