//! Serial instances and the fixed-capacity registry that owns them
//!
//! Every attached, supported device gets one [`SerialInstance`]. Instances live in the slots of a
//! [`Registry`] and are referred to by [`InstanceHandle`].
//!
//! Slots are handed out in order and never recycled: detaching a device marks its instance as disconnected
//! and releases its pipes, but the slot stays reserved. The registry capacity therefore bounds the total
//! number of attach events over the lifetime of the program, not just the number of devices connected at
//! the same time. In return a handle can never come to refer to a different device: once its device is
//! detached, every operation on it fails with [`SerialError::StaleHandle`](crate::SerialError::StaleHandle).

use crate::handler::CallbackData;
use crate::types::{DeviceAddress, PipeId, PipeKind};

/// Refers to a slot in the instance registry
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InstanceHandle(pub(crate) usize);

impl InstanceHandle {
    /// Index of the registry slot
    pub fn index(&self) -> usize {
        self.0
    }
}

/// State kept for one attached serial device
pub struct SerialInstance<'a> {
    /// Device this instance talks to. Cleared when the device is detached.
    pub(crate) device: Option<DeviceAddress>,
    pub(crate) ep0_max_packet_size: u8,
    pub(crate) connected: bool,
    /// Index into the driver table
    pub(crate) driver: usize,
    /// Set by `setup_instance`. Per-instance events are only delivered once this is set.
    pub(crate) callback: Option<CallbackData>,
    pub(crate) rx_buffer: Option<&'a mut [u8]>,

    pub(crate) bulk_in: Option<PipeId>,
    pub(crate) bulk_in_len: u16,

    pub(crate) bulk_out: Option<PipeId>,
    pub(crate) last_write_len: usize,

    pub(crate) interrupt_in: Option<PipeId>,
    pub(crate) interrupt_in_len: u16,
}

impl<'a> SerialInstance<'a> {
    pub(crate) fn new(device: DeviceAddress, ep0_max_packet_size: u8, driver: usize) -> Self {
        Self {
            device: Some(device),
            ep0_max_packet_size,
            connected: true,
            driver,
            callback: None,
            rx_buffer: None,
            bulk_in: None,
            bulk_in_len: 0,
            bulk_out: None,
            last_write_len: 0,
            interrupt_in: None,
            interrupt_in_len: 0,
        }
    }

    pub fn device(&self) -> Option<DeviceAddress> {
        self.device
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Index of the matched entry in the driver table
    pub fn driver_index(&self) -> usize {
        self.driver
    }

    /// Pipe allocated for the given kind of endpoint, if the device has one
    pub fn pipe(&self, kind: PipeKind) -> Option<PipeId> {
        match kind {
            PipeKind::BulkIn => self.bulk_in,
            PipeKind::BulkOut => self.bulk_out,
            PipeKind::InterruptIn => self.interrupt_in,
        }
    }

    pub(crate) fn pipe_mut(&mut self, kind: PipeKind) -> &mut Option<PipeId> {
        match kind {
            PipeKind::BulkIn => &mut self.bulk_in,
            PipeKind::BulkOut => &mut self.bulk_out,
            PipeKind::InterruptIn => &mut self.interrupt_in,
        }
    }

    /// Number of bytes delivered by the last receive event on the bulk IN pipe
    pub fn read_count(&self) -> u16 {
        self.bulk_in_len
    }

    /// Number of bytes delivered by the last receive event on the interrupt IN pipe
    pub fn interrupt_read_count(&self) -> u16 {
        self.interrupt_in_len
    }

    /// Size of the last write scheduled on the bulk OUT pipe
    pub fn last_write_len(&self) -> usize {
        self.last_write_len
    }

    fn owns(&self, kind: PipeKind, pipe: PipeId) -> bool {
        self.connected && self.pipe(kind) == Some(pipe)
    }
}

/// Fixed-capacity pool of serial instances
pub struct Registry<'a, const N: usize> {
    slots: [Option<SerialInstance<'a>>; N],
    count: usize,
}

impl<'a, const N: usize> Default for Registry<'a, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, const N: usize> Registry<'a, N> {
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| None),
            count: 0,
        }
    }

    /// Number of slots claimed so far (connected or not)
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn capacity(&self) -> usize {
        N
    }

    /// Place the instance in the next free slot
    ///
    /// Returns `None` (and leaves all slots untouched) if the registry is full.
    pub(crate) fn claim(&mut self, instance: SerialInstance<'a>) -> Option<InstanceHandle> {
        let slot = self.slots.get_mut(self.count)?;
        *slot = Some(instance);
        self.count += 1;
        Some(InstanceHandle(self.count - 1))
    }

    /// Access a claimed slot, whether its device is still connected or not
    pub fn slot(&self, handle: InstanceHandle) -> Option<&SerialInstance<'a>> {
        self.slots.get(handle.0)?.as_ref()
    }

    /// Access a connected instance
    pub fn get(&self, handle: InstanceHandle) -> Option<&SerialInstance<'a>> {
        self.slot(handle).filter(|instance| instance.connected)
    }

    /// Access a connected instance mutably
    pub fn get_mut(&mut self, handle: InstanceHandle) -> Option<&mut SerialInstance<'a>> {
        self.slots.get_mut(handle.0)?.as_mut().filter(|instance| instance.connected)
    }

    /// Find the connected instance that owns the given pipe
    ///
    /// Pipe ids are unique among connected instances, so the first match is the only one.
    pub(crate) fn find_by_pipe_mut(&mut self, kind: PipeKind, pipe: PipeId) -> Option<(InstanceHandle, &mut SerialInstance<'a>)> {
        self.slots[..self.count]
            .iter_mut()
            .enumerate()
            .find_map(|(index, slot)| match slot {
                Some(instance) if instance.owns(kind, pipe) => Some((InstanceHandle(index), instance)),
                _ => None,
            })
    }

    /// Find the connected instance for the given device
    pub fn find_by_device(&self, device: DeviceAddress) -> Option<InstanceHandle> {
        self.slots[..self.count]
            .iter()
            .position(|slot| matches!(slot, Some(instance) if instance.connected && instance.device == Some(device)))
            .map(InstanceHandle)
    }
}
