//! Interface between the serial driver and the application
//!
//! The application implements [`SerialHandler`] and passes it to every [`SerialHost`](crate::SerialHost)
//! method that can produce events (attach, detach, and the event entry points called by the host controller).
//!
//! ## Walkthrough for a newly connected adapter
//!
//! 1. The host controller enumerates the device, and calls [`attach`](crate::SerialHost::attach).
//! 2. If the device is supported, the handler's [`global_event`](SerialHandler::global_event) receives
//!    [`SerialEvent::Connected`] together with the new [`InstanceHandle`].
//! 3. The application calls [`setup_instance`](crate::SerialHost::setup_instance), registering [`CallbackData`]
//!    and (optionally) a receive buffer for the instance. Until this happens, no per-instance events are delivered.
//! 4. The application configures the link ([`init_device`](crate::SerialHost::init_device),
//!    [`set_line_config`](crate::SerialHost::set_line_config), ...) and starts writing with
//!    [`schedule_write`](crate::SerialHost::schedule_write).
//! 5. From now on [`instance_event`](SerialHandler::instance_event) receives [`SerialEvent::RxAvailable`] and
//!    [`SerialEvent::TxComplete`], and finally [`SerialEvent::Disconnected`] when the adapter is unplugged.

use crate::instance::InstanceHandle;
use crate::types::PipeKind;

pub mod log;

/// Opaque value, passed back to the application with every event of an instance
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CallbackData(pub u32);

/// Events delivered to the application
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SerialEvent<'d> {
    /// A supported device was attached
    Connected,
    /// The device was detached. The instance handle is stale from now on.
    Disconnected,
    /// Data was received on one of the IN pipes
    RxAvailable {
        /// The pipe the data arrived on (bulk IN for serial data, interrupt IN for notifications)
        pipe: PipeKind,
        /// The received data. Lives in the instance's receive buffer, if one was registered.
        data: &'d [u8],
    },
    /// A scheduled write has been sent
    TxComplete,
    /// A device was connected that no class driver could handle
    UnknownConnected,
    /// The host controller reported a power fault
    PowerFault,
}

pub trait SerialHandler {
    /// Events that are not tied to a set-up instance: [`SerialEvent::Connected`] (with the new instance),
    /// [`SerialEvent::UnknownConnected`] and [`SerialEvent::PowerFault`] (without).
    fn global_event(&mut self, _instance: Option<InstanceHandle>, _event: SerialEvent<'_>) {}

    /// Events for an instance, after [`setup_instance`](crate::SerialHost::setup_instance) was called for it.
    fn instance_event(&mut self, instance: InstanceHandle, event: SerialEvent<'_>, data: CallbackData);
}
