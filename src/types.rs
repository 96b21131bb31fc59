use core::num::NonZeroU8;
use usb_device::{UsbDirection, control::{Recipient, RequestType}};

/// An address that was assigned to a device by the host.
///
/// The address may or may not represent a device that is currently attached.
///
/// This type only represents assigned addresses, and thus cannot represent the special address 0.
/// Address 0 is only used to assign an address to the device, and should not be used by any drivers.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceAddress(pub(crate) NonZeroU8);

impl DeviceAddress {
    /// Wrap an address assigned by the host controller. Returns `None` for address 0.
    pub fn new(address: u8) -> Option<Self> {
        NonZeroU8::new(address).map(DeviceAddress)
    }
}

impl From<DeviceAddress> for u16 {
    fn from(value: DeviceAddress) -> Self {
        u8::from(value.0) as u16
    }
}

impl From<DeviceAddress> for u8 {
    fn from(value: DeviceAddress) -> Self {
        u8::from(value.0)
    }
}

/// Identifies a pipe, allocated by the host controller.
///
/// Pipe ids are only meaningful to the [`HostBus`](crate::bus::HostBus) that handed them out.
/// An endpoint that was not found on the device has no pipe at all (`Option<PipeId>` is `None`),
/// so there is no "unallocated" pipe id value.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PipeId(pub u8);

/// The kinds of pipes that the serial driver allocates
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PipeKind {
    BulkIn,
    BulkOut,
    InterruptIn,
}

/// Entry point of the event dispatcher, that events for a given pipe are delivered to.
///
/// Bulk pipes (both directions) share one entry point, the interrupt IN pipe has its own.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventEntry {
    Bulk,
    InterruptIn,
}

impl PipeKind {
    /// The dispatcher entry point that pipes of this kind must be bound to
    pub fn entry(self) -> EventEntry {
        match self {
            PipeKind::BulkIn | PipeKind::BulkOut => EventEntry::Bulk,
            PipeKind::InterruptIn => EventEntry::InterruptIn,
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
pub struct Bcd16(pub(crate) u16);

impl Bcd16 {
    /// All four nibbles are in the 0-9 range
    pub fn is_valid(value: u16) -> bool {
        (0..4).all(|nibble| (value >> (nibble * 4)) & 0xF < 10)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Bcd16 {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(
            fmt, "{}{}{}{}",
            (self.0 >> 12) & 0xF,
            (self.0 >> 8) & 0xF,
            (self.0 >> 4) & 0xF,
            self.0 & 0xF,
        )
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TransferType {
    Control = 0,
    Isochronous = 1,
    Bulk = 2,
    Interrupt = 3,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SetupPacket {
    pub request_type: u8,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    pub length: u16,
}

impl SetupPacket {
    pub fn new(direction: UsbDirection, request_type: RequestType, recipient: Recipient, request: u8, value: u16, index: u16, length: u16) -> Self {
        Self {
            request_type: (recipient as u8) | ((request_type as u8) << 5) | (direction as u8),
            request,
            value,
            index,
            length,
        }
    }

    /// Direction of the data stage
    pub fn direction(&self) -> UsbDirection {
        self.request_type.into()
    }
}
