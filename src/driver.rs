//! Driver table and chip family codecs
//!
//! The serial driver supports devices from a fixed set of chip families ([`Family`]). Which family handles a
//! device is decided at attach time, by matching the device against a table of [`DriverDescriptor`]s:
//! the first entry whose interface class matches, and whose vendor / product ids either match or are wildcards (zero),
//! is selected. Its index is stored in the instance, and all line configuration operations of that instance are
//! routed to the corresponding family's codec.
//!
//! The default table is [`DRIVERS`]. A custom table (for example to restrict the CP210x entry to other product ids)
//! can be passed to [`SerialHost::with_drivers`](crate::SerialHost::with_drivers).
//!
//! ## Codecs
//!
//! A codec translates the generic operations (baud rate, framing, handshake lines, flow control, break) into the
//! control requests of a chip family. Operations that a family can not express return [`SerialError::Unsupported`].
//!
//! | Operation           | CDC-ACM                           | CP210x                  |
//! |---------------------|-----------------------------------|-------------------------|
//! | init                | (nothing)                         | `IFC_ENABLE`            |
//! | set / get baud      | line coding (read-modify-write)   | `SET/GET_BAUDRATE`      |
//! | set / get coding    | line coding (read-modify-write)   | `SET/GET_LINE_CTL`      |
//! | set control lines   | `SET_CONTROL_LINE_STATE`          | unsupported             |
//! | set flow            | unsupported                       | `SET_FLOW`              |
//! | set / clear break   | unsupported                       | unsupported             |

use crate::coding::{ControlLines, FlowControl, Framing};
use crate::error::SerialError;
use crate::bus::HostBus;
use crate::pipe::ControlPipe;
use fugit::MillisDurationU32;

pub mod cdc;
pub mod cp210x;

/// Interface class of CDC communication interfaces
pub const CLASS_CDC: u8 = 0x02;
/// Interface class used by vendor specific devices
pub const CLASS_VENDOR_SPECIFIC: u8 = 0xFF;

/// Chip families that the serial driver can talk to
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Family {
    /// Devices implementing the CDC Abstract Control Model
    CdcAcm,
    /// Silicon Labs CP210x USB to UART bridges
    Cp210x,
}

/// Entry of the driver table
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DriverDescriptor {
    /// Class of the device's first interface
    pub interface_class: u8,
    /// Vendor id to match, or 0 to match any vendor
    pub vendor_id: u16,
    /// Product id to match, or 0 to match any product
    pub product_id: u16,
    /// Polling interval for the bulk IN pipe.
    ///
    /// When set, the host controller polls the bulk IN pipe, and the device's interrupt IN endpoint is not used.
    pub polling: Option<MillisDurationU32>,
    pub family: Family,
}

impl DriverDescriptor {
    /// Check if this entry handles a device with the given first interface class and ids.
    pub fn matches(&self, interface_class: u8, vendor_id: u16, product_id: u16) -> bool {
        self.interface_class == interface_class
            && (self.vendor_id == 0 || self.vendor_id == vendor_id)
            && (self.product_id == 0 || self.product_id == product_id)
    }

    pub fn is_polling(&self) -> bool {
        self.polling.is_some()
    }

    /// Interval to configure for the bulk IN pipe (zero when not polling)
    pub fn bulk_in_interval(&self) -> MillisDurationU32 {
        self.polling.unwrap_or(MillisDurationU32::from_ticks(0))
    }
}

/// The default driver table
pub static DRIVERS: [DriverDescriptor; 2] = [
    DriverDescriptor {
        interface_class: CLASS_CDC,
        vendor_id: 0,
        product_id: 0,
        polling: None,
        family: Family::CdcAcm,
    },
    DriverDescriptor {
        interface_class: CLASS_VENDOR_SPECIFIC,
        vendor_id: cp210x::VENDOR_ID,
        product_id: cp210x::PRODUCT_ID,
        polling: Some(MillisDurationU32::from_ticks(8)),
        family: Family::Cp210x,
    },
];

/// Find the first table entry matching the device. Returns its index.
pub fn match_driver(drivers: &[DriverDescriptor], interface_class: u8, vendor_id: u16, product_id: u16) -> Option<usize> {
    drivers
        .iter()
        .position(|driver| driver.matches(interface_class, vendor_id, product_id))
}

impl Family {
    /// Bring the device into a state where it can transfer data
    pub fn init<B: HostBus>(self, control: &mut ControlPipe<'_, B>) -> Result<(), SerialError> {
        match self {
            Family::CdcAcm => cdc::init(control),
            Family::Cp210x => cp210x::init(control),
        }
    }

    pub fn set_baud<B: HostBus>(self, control: &mut ControlPipe<'_, B>, baud: u32) -> Result<(), SerialError> {
        match self {
            Family::CdcAcm => cdc::set_baud(control, baud),
            Family::Cp210x => cp210x::set_baud(control, baud),
        }
    }

    pub fn get_baud<B: HostBus>(self, control: &mut ControlPipe<'_, B>) -> Result<u32, SerialError> {
        match self {
            Family::CdcAcm => cdc::get_baud(control),
            Family::Cp210x => cp210x::get_baud(control),
        }
    }

    pub fn set_coding<B: HostBus>(self, control: &mut ControlPipe<'_, B>, framing: Framing) -> Result<(), SerialError> {
        match self {
            Family::CdcAcm => cdc::set_coding(control, framing),
            Family::Cp210x => cp210x::set_coding(control, framing),
        }
    }

    pub fn get_coding<B: HostBus>(self, control: &mut ControlPipe<'_, B>) -> Result<Framing, SerialError> {
        match self {
            Family::CdcAcm => cdc::get_coding(control),
            Family::Cp210x => cp210x::get_coding(control),
        }
    }

    pub fn set_control_lines<B: HostBus>(self, control: &mut ControlPipe<'_, B>, lines: ControlLines) -> Result<(), SerialError> {
        match self {
            Family::CdcAcm => cdc::set_control_lines(control, lines),
            Family::Cp210x => cp210x::set_control_lines(control, lines),
        }
    }

    pub fn get_control_lines<B: HostBus>(self, control: &mut ControlPipe<'_, B>) -> Result<ControlLines, SerialError> {
        match self {
            Family::CdcAcm => cdc::get_control_lines(control),
            Family::Cp210x => cp210x::get_control_lines(control),
        }
    }

    pub fn set_flow<B: HostBus>(self, control: &mut ControlPipe<'_, B>, flow: FlowControl) -> Result<(), SerialError> {
        match self {
            Family::CdcAcm => cdc::set_flow(control, flow),
            Family::Cp210x => cp210x::set_flow(control, flow),
        }
    }

    pub fn set_break<B: HostBus>(self, control: &mut ControlPipe<'_, B>) -> Result<(), SerialError> {
        match self {
            Family::CdcAcm => cdc::set_break(control),
            Family::Cp210x => cp210x::set_break(control),
        }
    }

    pub fn clear_break<B: HostBus>(self, control: &mut ControlPipe<'_, B>) -> Result<(), SerialError> {
        match self {
            Family::CdcAcm => cdc::clear_break(control),
            Family::Cp210x => cp210x::clear_break(control),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        assert_eq!(match_driver(&DRIVERS, CLASS_CDC, 0x2341, 0x0043), Some(0));
        assert_eq!(match_driver(&DRIVERS, CLASS_VENDOR_SPECIFIC, 0x10C4, 0xEA60), Some(1));
        assert_eq!(match_driver(&DRIVERS, CLASS_VENDOR_SPECIFIC, 0x10C4, 0xEA70), None);
        assert_eq!(match_driver(&DRIVERS, CLASS_VENDOR_SPECIFIC, 0x0403, 0x6001), None);
        assert_eq!(match_driver(&DRIVERS, 0x03, 0x10C4, 0xEA60), None);

        assert!(!DRIVERS[0].is_polling());
        assert_eq!(DRIVERS[0].bulk_in_interval().ticks(), 0);
        assert_eq!(DRIVERS[1].bulk_in_interval().ticks(), 8);
    }

    #[test]
    fn test_first_match_wins() {
        let table = [
            DriverDescriptor {
                interface_class: CLASS_VENDOR_SPECIFIC,
                vendor_id: 0x10C4,
                product_id: 0,
                polling: None,
                family: Family::CdcAcm,
            },
            DriverDescriptor {
                interface_class: CLASS_VENDOR_SPECIFIC,
                vendor_id: 0x10C4,
                product_id: 0xEA60,
                polling: Some(MillisDurationU32::from_ticks(8)),
                family: Family::Cp210x,
            },
        ];
        assert_eq!(match_driver(&table, CLASS_VENDOR_SPECIFIC, 0x10C4, 0xEA60), Some(0));
        assert_eq!(match_driver(&table[1..], CLASS_VENDOR_SPECIFIC, 0x10C4, 0xEA60), Some(0));
        assert_eq!(match_driver(&[], CLASS_CDC, 0, 0), None);
    }
}
