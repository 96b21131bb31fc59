//! Interface for the host controller
//!
//! The serial driver does not talk to hardware directly. It sits on top of a host controller driver, which
//! enumerates devices, owns the pipe hardware and executes transfers. In order to use `usbh-serial`
//! there must be a [`HostBus`] implementation for the platform's host controller.
//!
//! Events flow the other way as messages: whenever something happens on a pipe that was allocated by
//! the serial driver, the host controller hands a [`PipeEvent`] to [`SerialHost::handle_pipe_event`](crate::SerialHost::handle_pipe_event).
//! Global conditions (unknown device, power fault) are delivered as a [`HostEvent`].
//!
//! ## Delivery guarantees
//!
//! The serial driver does no locking. The host controller must deliver events one at a time, from a single
//! context (for example from its interrupt handler, or from a queue drained by the main loop), and must not
//! deliver an event while any other `SerialHost` method is running. Events for the same pipe must be delivered
//! in the order they occurred.

use crate::types::{DeviceAddress, EventEntry, PipeId, PipeKind, SetupPacket};
use fugit::MillisDurationU32;

pub trait HostBus {
    /// Register the serial driver as the class driver for the given interface class.
    ///
    /// Called once per distinct interface class of the driver table, when the [`SerialHost`](crate::SerialHost) is created.
    /// Afterwards the host controller should attach devices whose first interface has this class.
    fn register_class_driver(&mut self, interface_class: u8);

    /// Allocate a pipe of the given kind for the device.
    ///
    /// Events for the pipe must be delivered with the given `entry`.
    /// Returns `None` if the host controller has no pipe left.
    fn alloc_pipe(&mut self, kind: PipeKind, device: DeviceAddress, max_packet_size: u16, entry: EventEntry) -> Option<PipeId>;

    /// Configure a previously allocated pipe.
    ///
    /// An `interval` of zero means that the pipe is not polled by the host controller.
    fn configure_pipe(&mut self, pipe: PipeId, max_packet_size: u16, interval: MillisDurationU32, endpoint_number: u8);

    /// Release a pipe. No more events must be delivered for it afterwards.
    fn free_pipe(&mut self, pipe: PipeId);

    /// Schedule an OUT transaction with the given data, without blocking.
    ///
    /// Completion is reported as a [`PipeEventKind::TxComplete`] event.
    /// Returns the number of bytes that were accepted.
    fn schedule_write(&mut self, pipe: PipeId, data: &[u8]) -> usize;

    /// Schedule an IN transaction, without blocking.
    ///
    /// Received data is reported as a [`PipeEventKind::RxAvailable`] event.
    fn schedule_read(&mut self, pipe: PipeId);

    /// Number of bytes that are currently available to be read from the pipe.
    fn available(&self, pipe: PipeId) -> u16;

    /// Read up to `buf.len()` available bytes from the pipe, without blocking.
    ///
    /// This must be called even when nothing is available, to reset the pipe's state.
    /// Returns the number of bytes read.
    fn read(&mut self, pipe: PipeId, buf: &mut [u8]) -> usize;

    /// Execute a control transfer with an IN data stage on the device's default pipe, and wait for it to complete.
    ///
    /// Returns the number of bytes received into `buf`.
    fn control_in(&mut self, device: DeviceAddress, setup: SetupPacket, buf: &mut [u8], max_packet_size: u8) -> usize;

    /// Execute a control transfer with an (optional) OUT data stage on the device's default pipe, and wait for it to complete.
    ///
    /// Returns the number of bytes sent from `data`.
    fn control_out(&mut self, device: DeviceAddress, setup: SetupPacket, data: &[u8], max_packet_size: u8) -> usize;
}

/// Something happened on a pipe
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PipeEvent {
    /// The pipe that the event concerns
    pub pipe: PipeId,
    /// The entry point the pipe was bound to, when it was allocated
    pub entry: EventEntry,
    /// What happened
    pub kind: PipeEventKind,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PipeEventKind {
    /// Data was received on an IN pipe
    RxAvailable,
    /// An OUT transaction has finished
    TxComplete,
    /// The pipe is idle, and ready for another transaction (only for polled pipes)
    Scheduler,
}

/// Events from the host controller that are not related to a serial device
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HostEvent {
    /// Some device was connected
    Connected,
    /// A device was connected, that none of the class drivers can handle
    UnknownConnected,
    /// Some device was disconnected
    Disconnected,
    /// The host controller detected a power fault on the bus
    PowerFault,
}
