use super::{CallbackData, SerialEvent, SerialHandler};
use crate::instance::InstanceHandle;
use bitflags::bitflags;

/// A [`SerialHandler`] which logs events
///
/// Useful while bringing up a new host controller: it shows which devices get attached, and which
/// pipe events reach the serial driver. Received data is logged as raw bytes.
pub struct LogHandler(EventMask);

bitflags! {
    /// Used to select which events are logged by the [`LogHandler`]
    ///
    /// Each of the flags corresponds to one of the [`SerialEvent`] variants.
    #[derive(Copy, Clone, PartialEq, Eq, Debug)]
    pub struct EventMask: u8 {
        const CONNECTED = 1 << 0;
        const DISCONNECTED = 1 << 1;
        const RX_AVAILABLE = 1 << 2;
        const TX_COMPLETE = 1 << 3;
        const UNKNOWN_CONNECTED = 1 << 4;
        const POWER_FAULT = 1 << 5;
    }
}

impl EventMask {
    fn of(event: &SerialEvent<'_>) -> Self {
        match event {
            SerialEvent::Connected => EventMask::CONNECTED,
            SerialEvent::Disconnected => EventMask::DISCONNECTED,
            SerialEvent::RxAvailable { .. } => EventMask::RX_AVAILABLE,
            SerialEvent::TxComplete => EventMask::TX_COMPLETE,
            SerialEvent::UnknownConnected => EventMask::UNKNOWN_CONNECTED,
            SerialEvent::PowerFault => EventMask::POWER_FAULT,
        }
    }
}

impl LogHandler {
    pub fn new(event_mask: EventMask) -> Self {
        Self(event_mask)
    }

    /// Whether the given event passes the mask
    pub fn logs(&self, event: &SerialEvent<'_>) -> bool {
        self.0.contains(EventMask::of(event))
    }
}

impl SerialHandler for LogHandler {
    fn global_event(&mut self, instance: Option<InstanceHandle>, event: SerialEvent<'_>) {
        if self.logs(&event) {
            match instance {
                Some(instance) => info!("[usbh-serial LogHandler] Instance {}: {}", instance.index(), event),
                None => info!("[usbh-serial LogHandler] {}", event),
            }
        }
    }

    fn instance_event(&mut self, instance: InstanceHandle, event: SerialEvent<'_>, data: CallbackData) {
        if self.logs(&event) {
            match event {
                SerialEvent::RxAvailable { pipe, data: received } => info!(
                    "[usbh-serial LogHandler] Instance {} ({}): received {} bytes on {}: {:X}",
                    instance.index(),
                    data.0,
                    received.len(),
                    pipe,
                    received,
                ),
                _ => info!(
                    "[usbh-serial LogHandler] Instance {} ({}): {}",
                    instance.index(),
                    data.0,
                    event,
                ),
            }
        }
    }
}
