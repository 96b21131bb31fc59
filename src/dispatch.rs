//! Routing of pipe events to instances
//!
//! Events arrive at one of two entry points, chosen when the pipe was allocated: bulk pipes (IN and OUT) share
//! [`bulk_event`](SerialHost::bulk_event), the interrupt IN pipe uses [`interrupt_in_event`](SerialHost::interrupt_in_event).
//! The owning instance is found by comparing the event's pipe with the pipes of all connected instances.
//!
//! Received data is always read from the pipe, even if no instance owns it. Otherwise the pipe would stay busy.

use crate::bus::{HostBus, PipeEvent, PipeEventKind};
use crate::handler::{SerialEvent, SerialHandler};
use crate::types::{EventEntry, PipeId, PipeKind};
use crate::SerialHost;

impl<'a, B: HostBus, const N: usize> SerialHost<'a, B, N> {
    /// Entry point for all events on pipes allocated by the serial driver
    pub fn handle_pipe_event(&mut self, event: PipeEvent, handler: &mut dyn SerialHandler) {
        match event.entry {
            EventEntry::Bulk => self.bulk_event(event.pipe, event.kind, handler),
            EventEntry::InterruptIn => self.interrupt_in_event(event.pipe, event.kind, handler),
        }
    }

    /// Handle an event on a bulk IN or bulk OUT pipe
    pub fn bulk_event(&mut self, pipe: PipeId, kind: PipeEventKind, handler: &mut dyn SerialHandler) {
        match kind {
            PipeEventKind::RxAvailable => self.receive(pipe, PipeKind::BulkIn, handler),
            PipeEventKind::TxComplete => self.transmit_complete(pipe, handler),
            PipeEventKind::Scheduler => self.reschedule(pipe, PipeKind::BulkIn),
        }
    }

    /// Handle an event on an interrupt IN pipe
    pub fn interrupt_in_event(&mut self, pipe: PipeId, kind: PipeEventKind, handler: &mut dyn SerialHandler) {
        match kind {
            PipeEventKind::RxAvailable => self.receive(pipe, PipeKind::InterruptIn, handler),
            PipeEventKind::Scheduler => self.reschedule(pipe, PipeKind::InterruptIn),
            PipeEventKind::TxComplete => trace!("[usbh-serial] Ignoring TX complete on interrupt pipe {}", pipe.0),
        }
    }

    fn receive(&mut self, pipe: PipeId, kind: PipeKind, handler: &mut dyn SerialHandler) {
        let available = self.bus.available(pipe) as usize;

        let Some((handle, instance)) = self.registry.find_by_pipe_mut(kind, pipe) else {
            let len = available.min(self.scratch.len());
            let drained = self.bus.read(pipe, &mut self.scratch[..len]);
            debug!("[usbh-serial] Dropped {} bytes from unowned pipe {}", drained, pipe.0);
            return;
        };

        let buffer: &mut [u8] = match instance.rx_buffer.as_deref_mut() {
            Some(buffer) => buffer,
            None => &mut self.scratch[..],
        };
        let len = available.min(buffer.len());
        let read = self.bus.read(pipe, &mut buffer[..len]);

        match kind {
            PipeKind::InterruptIn => instance.interrupt_in_len = read as u16,
            _ => instance.bulk_in_len = read as u16,
        }

        if read == 0 {
            return;
        }
        if let Some(data) = instance.callback {
            handler.instance_event(handle, SerialEvent::RxAvailable { pipe: kind, data: &buffer[..read] }, data);
        }
    }

    fn transmit_complete(&mut self, pipe: PipeId, handler: &mut dyn SerialHandler) {
        match self.registry.find_by_pipe_mut(PipeKind::BulkOut, pipe) {
            Some((handle, instance)) => {
                if let Some(data) = instance.callback {
                    handler.instance_event(handle, SerialEvent::TxComplete, data);
                }
            }
            None => trace!("[usbh-serial] TX complete on unowned pipe {}", pipe.0),
        }
    }

    fn reschedule(&mut self, pipe: PipeId, kind: PipeKind) {
        if self.registry.find_by_pipe_mut(kind, pipe).is_some() {
            self.bus.schedule_read(pipe);
        } else {
            warn!("[usbh-serial] Scheduler event for unowned pipe {}", pipe.0);
        }
    }
}
