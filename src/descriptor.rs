//! Standard descriptors, and how to find the interfaces and endpoints of a configuration
//!
//! The host controller hands a newly enumerated device to the serial driver together with the raw
//! configuration descriptor, as returned by `GET_DESCRIPTOR(Configuration)`. That blob contains the
//! configuration descriptor itself, followed by all interface, endpoint and class specific descriptors.
//!
//! - [`Descriptors`] iterates over the framed descriptors in such a blob.
//! - [`Configuration`] wraps a full blob, and allows looking up interfaces by number and alternate setting.
//! - [`Interface`] yields the endpoint descriptors that belong to one interface.
//!
//! The [`parse`] submodule contains the `nom` parsers for the individual descriptor types.

use crate::types::{Bcd16, TransferType};
use usb_device::UsbDirection;

/// [`descriptor_type`](Descriptor::descriptor_type) identifying a [`DeviceDescriptor`]
pub const TYPE_DEVICE: u8 = 1;
/// [`descriptor_type`](Descriptor::descriptor_type) identifying a [`ConfigurationDescriptor`]
pub const TYPE_CONFIGURATION: u8 = 2;
/// [`descriptor_type`](Descriptor::descriptor_type) identifying a string descriptor
pub const TYPE_STRING: u8 = 3;
/// [`descriptor_type`](Descriptor::descriptor_type) identifying an [`InterfaceDescriptor`]
pub const TYPE_INTERFACE: u8 = 4;
/// [`descriptor_type`](Descriptor::descriptor_type) identifying an [`EndpointDescriptor`]
pub const TYPE_ENDPOINT: u8 = 5;

/// Outer framing of a descriptor
pub struct Descriptor<'a> {
    /// Total length of the descriptor, including this length byte itself and the `descriptor_type` byte
    pub length: u8,
    /// Type of descriptor. If this is a standard descriptor, it corresponds to one of the `TYPE_*` constants,
    /// otherwise it is class or vendor specific.
    pub descriptor_type: u8,
    /// Remaining data of the descriptor (`length - 2` bytes)
    pub data: &'a [u8],
}

/// General information about a USB device, shared by all of its configurations.
#[derive(Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceDescriptor {
    /// USB Specification Release Number in Binary-Coded Decimal (i.e., 2.10 is 210H).
    pub usb_release: Bcd16,
    /// Class code (assigned by the USB-IF).
    ///
    /// Zero means that each interface specifies its own class. Serial adapters usually do that,
    /// which is why drivers are matched against the class of the first interface instead.
    pub device_class: u8,
    /// Subclass code (assigned by the USB-IF).
    pub device_sub_class: u8,
    /// Protocol code (assigned by the USB-IF).
    pub device_protocol: u8,
    /// Maximum packet size for endpoint zero
    ///
    /// (only 8, 16, 32, or 64 are valid)
    pub max_packet_size: u8,
    /// Vendor ID (assigned by the USB-IF)
    pub id_vendor: u16,
    /// Product ID (assigned by the manufacturer)
    pub id_product: u16,
    /// Device release number in binary-coded decimal
    pub device_release: Bcd16,
    /// Index of string descriptor describing manufacturer
    pub manufacturer_index: u8,
    /// Index of string descriptor describing product
    pub product_index: u8,
    /// Index of string descriptor describing the device's serial number
    pub serial_number_index: u8,
    /// Number of possible configurations
    pub num_configurations: u8,
}

/// Describes one configuration of a device.
#[derive(Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConfigurationDescriptor {
    /// Total length of data returned for this configuration, including all nested descriptors.
    pub total_length: u16,
    /// Number of interfaces supported by this configuration
    pub num_interfaces: u8,
    /// Value to use as an argument to the SetConfiguration() request to select this configuration
    pub value: u8,
    /// Index of string descriptor describing this configuration
    pub index: u8,
    /// Configuration characteristics (self powered, remote wakeup)
    pub attributes: u8,
    /// Maximum power consumption, in 2 mA units
    pub max_power: u8,
}

/// Describes one (alternate setting of an) interface within a configuration.
///
/// The endpoint descriptors for the interface follow it directly within the configuration descriptor.
#[derive(Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InterfaceDescriptor {
    /// Zero-based number of this interface
    pub interface_number: u8,
    /// Value used to select this alternate setting for the interface identified in the prior field
    pub alternate_setting: u8,
    /// Number of endpoints used by this interface (excluding endpoint zero).
    pub num_endpoints: u8,
    /// Class code (assigned by the USB-IF). `0xFF` is vendor specific.
    pub interface_class: u8,
    /// Subclass code (assigned by the USB-IF).
    pub interface_sub_class: u8,
    /// Protocol code (assigned by the USB-IF).
    pub interface_protocol: u8,
    /// Index of string descriptor describing this interface
    pub interface_index: u8,
}

/// Each endpoint used for an interface has its own descriptor.
#[derive(Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EndpointDescriptor {
    /// The address of the endpoint on the USB device described by this descriptor.
    pub address: EndpointAddress,
    /// Transfer type (and isochronous details)
    pub attributes: EndpointAttributes,
    /// Maximum packet size this endpoint is capable of sending or receiving.
    pub max_packet_size: u16,
    /// Interval for polling endpoint for data transfers.
    ///
    /// Expressed in frames (1 millisecond).
    pub interval: u8,
}

/// Address of an endpoint
///
/// Part of an [`EndpointDescriptor`].
#[derive(Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EndpointAddress(pub(crate) u8);

impl EndpointAddress {
    /// Endpoint number
    ///
    /// Ranges from 1 to 15.
    pub fn number(&self) -> u8 {
        self.0 & 0x0F
    }

    /// Direction of the endpoint
    pub fn direction(&self) -> UsbDirection {
        self.0.into()
    }
}

/// Attributes of an endpoint
///
/// Part of an [`EndpointDescriptor`].
#[derive(Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EndpointAttributes(pub(crate) u8);

impl EndpointAttributes {
    pub fn transfer_type(&self) -> TransferType {
        match self.0 & 0b11 {
            0 => TransferType::Control,
            1 => TransferType::Isochronous,
            2 => TransferType::Bulk,
            _ => TransferType::Interrupt,
        }
    }
}

/// Iterator over the framed descriptors contained in a buffer
///
/// Stops at the end of the data, or at the first descriptor that cannot be parsed.
pub struct Descriptors<'a>(&'a [u8]);

impl<'a> Descriptors<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self(data)
    }
}

impl<'a> Iterator for Descriptors<'a> {
    type Item = Descriptor<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.0.is_empty() {
            return None;
        }
        match parse::any_descriptor(self.0) {
            Ok((rest, descriptor)) => {
                self.0 = rest;
                Some(descriptor)
            }
            Err(_) => {
                self.0 = &[];
                None
            }
        }
    }
}

/// A full configuration descriptor, including all nested descriptors
pub struct Configuration<'a> {
    pub descriptor: ConfigurationDescriptor,
    nested: &'a [u8],
}

impl<'a> Configuration<'a> {
    /// Parse a configuration descriptor blob
    ///
    /// Returns `None` if the blob does not start with a valid configuration descriptor.
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        let (nested, framing) = parse::any_descriptor(data).ok()?;
        if framing.descriptor_type != TYPE_CONFIGURATION {
            return None;
        }
        let (_, descriptor) = parse::configuration_descriptor(framing.data).ok()?;
        Some(Self { descriptor, nested })
    }

    /// Number of interfaces, as announced by the configuration descriptor
    pub fn num_interfaces(&self) -> u8 {
        self.descriptor.num_interfaces
    }

    /// Look up the interface with the given number and alternate setting
    pub fn interface(&self, number: u8, alternate_setting: u8) -> Option<Interface<'a>> {
        let mut descriptors = Descriptors::new(self.nested);
        while let Some(framing) = descriptors.next() {
            if framing.descriptor_type != TYPE_INTERFACE {
                continue;
            }
            if let Ok((_, descriptor)) = parse::interface_descriptor(framing.data) {
                if descriptor.interface_number == number && descriptor.alternate_setting == alternate_setting {
                    return Some(Interface { descriptor, following: descriptors.0 });
                }
            }
        }
        None
    }
}

/// An interface within a [`Configuration`]
pub struct Interface<'a> {
    pub descriptor: InterfaceDescriptor,
    following: &'a [u8],
}

impl<'a> Interface<'a> {
    /// Endpoint descriptors belonging to this interface, in the order they appear.
    ///
    /// Class specific descriptors in between are skipped. Iteration ends at the next interface descriptor.
    pub fn endpoints(&self) -> impl Iterator<Item = EndpointDescriptor> + 'a {
        Descriptors::new(self.following)
            .take_while(|framing| framing.descriptor_type != TYPE_INTERFACE)
            .filter(|framing| framing.descriptor_type == TYPE_ENDPOINT)
            .filter_map(|framing| parse::endpoint_descriptor(framing.data).ok().map(|(_, endpoint)| endpoint))
    }
}

pub mod parse {
    use nom::IResult;
    use nom::combinator::{map, verify};
    use nom::sequence::tuple;
    use nom::bytes::complete::take;
    use nom::number::complete::{u8, le_u16};

    use super::*;

    /// Parse outer framing of a descriptor
    ///
    /// The resulting `data` within the descriptor can then be parsed with one of the other functions below,
    /// depending on the `type`.
    pub fn any_descriptor(input: &[u8]) -> IResult<&[u8], Descriptor<'_>> {
        let (input, (length, descriptor_type)) = tuple((verify(u8, |length: &u8| *length >= 2), u8))(input)?;
        let (input, data) = take((length - 2) as usize)(input)?;
        Ok((input, Descriptor { length, descriptor_type, data }))
    }

    /// Parse descriptor data for a device
    pub fn device_descriptor(input: &[u8]) -> IResult<&[u8], DeviceDescriptor> {
        map(
            tuple((bcd_16, u8, u8, u8, u8, le_u16, le_u16, bcd_16, u8, u8, u8, u8)),
            |(usb_release, device_class, device_sub_class, device_protocol, max_packet_size,
              id_vendor, id_product, device_release, manufacturer_index, product_index,
              serial_number_index, num_configurations)| {
                DeviceDescriptor {
                    usb_release, device_class, device_sub_class, device_protocol, max_packet_size,
                    id_vendor, id_product, device_release, manufacturer_index, product_index,
                    serial_number_index, num_configurations,
                }
            }
        )(input)
    }

    /// Parse descriptor data for a configuration
    pub fn configuration_descriptor(input: &[u8]) -> IResult<&[u8], ConfigurationDescriptor> {
        map(
            tuple((le_u16, u8, u8, u8, u8, u8)),
            |(total_length, num_interfaces, value, index, attributes, max_power)| {
                ConfigurationDescriptor { total_length, num_interfaces, value, index, attributes, max_power }
            }
        )(input)
    }

    /// Parse descriptor data for an interface
    pub fn interface_descriptor(input: &[u8]) -> IResult<&[u8], InterfaceDescriptor> {
        map(
            tuple((u8, u8, u8, u8, u8, u8, u8)),
            |(interface_number, alternate_setting, num_endpoints, interface_class, interface_sub_class,
              interface_protocol, interface_index)| {
                InterfaceDescriptor {
                    interface_number, alternate_setting, num_endpoints, interface_class, interface_sub_class,
                    interface_protocol, interface_index,
                }
            }
        )(input)
    }

    /// Parse descriptor data for an endpoint
    pub fn endpoint_descriptor(input: &[u8]) -> IResult<&[u8], EndpointDescriptor> {
        map(
            tuple((u8, u8, le_u16, u8)),
            |(address, attributes, max_packet_size, interval)| {
                EndpointDescriptor {
                    address: EndpointAddress(address),
                    attributes: EndpointAttributes(attributes),
                    max_packet_size,
                    interval,
                }
            }
        )(input)
    }

    /// Parses a 16-bit binary coded decimal value
    ///
    /// Succeeds only if all four nibbles (i.e. half-bytes) are in the 0-9 range.
    pub fn bcd_16(input: &[u8]) -> IResult<&[u8], Bcd16> {
        map(verify(le_u16, |value: &u16| Bcd16::is_valid(*value)), Bcd16)(input)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_any_descriptor() {
            let data = [8, 7, 6, 5, 4, 3, 2, 1, 0];
            let (rest, desc) = any_descriptor(&data).unwrap();
            assert_eq!(desc.length, 8);
            assert_eq!(desc.descriptor_type, 7);
            assert_eq!(desc.data, &[6, 5, 4, 3, 2, 1]);
            assert_eq!(rest, &[0]);
        }

        #[test]
        fn test_any_descriptor_rejects_short_length() {
            assert!(any_descriptor(&[1, 4, 0]).is_err());
            assert!(any_descriptor(&[9, 4, 0]).is_err());
        }

        #[test]
        fn test_bcd_16() {
            let (_, Bcd16(bcd)) = bcd_16(&[0x10, 0x02]).unwrap();
            assert_eq!(bcd, 0x0210);

            assert!(bcd_16(&[0x00, 0x09]).is_ok());
            assert!(bcd_16(&[0x00, 0x0A]).is_err());
            assert!(bcd_16(&[0x0F, 0x00]).is_err());
        }

        #[test]
        fn test_device_descriptor() {
            let data = [
                0x00, 0x02, 0x00, 0x00, 0x00, 0x40, 0xC4, 0x10, 0x60, 0xEA,
                0x00, 0x01, 0x01, 0x02, 0x03, 0x01,
            ];
            let (_, desc) = device_descriptor(&data).unwrap();
            assert_eq!(desc.max_packet_size, 64);
            assert_eq!(desc.id_vendor, 0x10C4);
            assert_eq!(desc.id_product, 0xEA60);
            assert_eq!(desc.num_configurations, 1);
        }
    }
}
