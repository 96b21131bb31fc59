//! Line coding and handshake line types, shared by all chip families

use bitflags::bitflags;
use nom::IResult;
use nom::combinator::{map, map_opt};
use nom::number::complete::{le_u32, u8};
use nom::sequence::tuple;

/// Number of stop bits
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum StopBits {
    One = 0,
    OnePointFive = 1,
    Two = 2,
}

impl StopBits {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(StopBits::One),
            1 => Some(StopBits::OnePointFive),
            2 => Some(StopBits::Two),
            _ => None,
        }
    }
}

/// Parity bit
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Parity {
    None = 0,
    Odd = 1,
    Even = 2,
    Mark = 3,
    Space = 4,
}

impl Parity {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Parity::None),
            1 => Some(Parity::Odd),
            2 => Some(Parity::Even),
            3 => Some(Parity::Mark),
            4 => Some(Parity::Space),
            _ => None,
        }
    }
}

/// Number of data bits. Encoded as the literal bit count.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DataBits {
    Five = 5,
    Six = 6,
    Seven = 7,
    Eight = 8,
}

impl DataBits {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            5 => Some(DataBits::Five),
            6 => Some(DataBits::Six),
            7 => Some(DataBits::Seven),
            8 => Some(DataBits::Eight),
            _ => None,
        }
    }
}

/// Character framing: stop bits, parity and data bits
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Framing {
    pub stop_bits: StopBits,
    pub parity: Parity,
    pub data_bits: DataBits,
}

impl Default for Framing {
    /// 8N1
    fn default() -> Self {
        Self {
            stop_bits: StopBits::One,
            parity: Parity::None,
            data_bits: DataBits::Eight,
        }
    }
}

impl Framing {
    pub const STOP_MASK: u16 = 0x000F;
    pub const PARITY_MASK: u16 = 0x00F0;
    pub const DATA_MASK: u16 = 0xFF00;

    /// Packed representation
    ///
    /// Bits 0-3 hold the stop bits code, bits 4-7 the parity code and bits 8-15 the number of data bits.
    /// This is the layout of the vendor chip's line control word.
    pub fn to_bits(self) -> u16 {
        (self.stop_bits as u16) | ((self.parity as u16) << 4) | ((self.data_bits as u16) << 8)
    }

    /// Unpack a value produced by [`Framing::to_bits`]
    ///
    /// Returns `None` if any of the fields holds an undefined code.
    pub fn from_bits(bits: u16) -> Option<Self> {
        Some(Self {
            stop_bits: StopBits::from_code((bits & Self::STOP_MASK) as u8)?,
            parity: Parity::from_code(((bits & Self::PARITY_MASK) >> 4) as u8)?,
            data_bits: DataBits::from_code(((bits & Self::DATA_MASK) >> 8) as u8)?,
        })
    }
}

/// Baud rate plus framing, as exchanged by the CDC `GET_LINE_CODING` / `SET_LINE_CODING` requests
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineCoding {
    pub baud: u32,
    pub framing: Framing,
}

impl LineCoding {
    /// Size of the encoded structure
    pub const SIZE: usize = 7;

    /// Encode as 4 bytes little endian baud rate, followed by stop bits, parity and data bits codes.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let baud = self.baud.to_le_bytes();
        [
            baud[0], baud[1], baud[2], baud[3],
            self.framing.stop_bits as u8,
            self.framing.parity as u8,
            self.framing.data_bits as u8,
        ]
    }

    /// Decode the 7 byte structure. Trailing data is ignored.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        parse_line_coding(data).ok().map(|(_, coding)| coding)
    }
}

fn parse_line_coding(input: &[u8]) -> IResult<&[u8], LineCoding> {
    map(
        tuple((
            le_u32,
            map_opt(u8, StopBits::from_code),
            map_opt(u8, Parity::from_code),
            map_opt(u8, DataBits::from_code),
        )),
        |(baud, stop_bits, parity, data_bits)| LineCoding {
            baud,
            framing: Framing { stop_bits, parity, data_bits },
        },
    )(input)
}

bitflags! {
    /// Modem control and status lines
    #[derive(Copy, Clone, PartialEq, Eq, Debug)]
    pub struct ControlLines: u32 {
        const CTS = 0x01;
        const DSR = 0x02;
        const RI = 0x04;
        const DCD = 0x08;
        const DTR = 0x10;
        const RTS = 0x20;
    }
}

bitflags! {
    /// Flow control settings
    ///
    /// The DTR mode occupies the lowest two bits: low (no bit set), [`FlowControl::DTR_HIGH`] or [`FlowControl::DTR_AUTO`].
    #[derive(Copy, Clone, PartialEq, Eq, Debug)]
    pub struct FlowControl: u32 {
        const DTR_HIGH = 0x01;
        const DTR_AUTO = 0x02;
        const CTS_HANDSHAKE = 0x08;
        const DSR_HANDSHAKE = 0x10;
        const DCD_HANDSHAKE = 0x20;
        const DSR_SENSITIVITY = 0x40;
    }
}
