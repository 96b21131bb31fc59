/// Reasons why [`SerialHost::attach`](crate::SerialHost::attach) did not produce an instance
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AttachError {
    /// None of the driver descriptors matches the device. It is left to other class drivers.
    Unsupported,
    /// All instance slots have been used up.
    RegistryFull,
    /// The configuration descriptor could not be parsed, or has no interface 0.
    InvalidDescriptor,
}

/// Error type for operations on a serial instance
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SerialError {
    /// The handle does not refer to a connected instance.
    ///
    /// This happens when the device was detached meanwhile.
    StaleHandle,

    /// The device does not have the endpoint needed for this operation.
    NoPipe,

    /// A control transfer moved fewer bytes than requested.
    ShortTransfer {
        expected: usize,
        actual: usize,
    },

    /// The device reported a line coding with undefined stop bits, parity or data bits.
    InvalidCoding,

    /// The chip family driving this instance does not implement the operation.
    Unsupported,
}

/// Check that a control transfer moved as many bytes as requested
pub(crate) fn expect_len(expected: usize, actual: usize) -> Result<(), SerialError> {
    if actual < expected {
        Err(SerialError::ShortTransfer { expected, actual })
    } else {
        Ok(())
    }
}
