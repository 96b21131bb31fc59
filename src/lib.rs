//! USB host serial class driver
//!
//! Drives USB to serial adapters from the host side: devices implementing the CDC Abstract Control Model, and
//! Silicon Labs CP210x bridges. The driver sits on top of a host controller driver, which must implement the
//! [`HostBus`] trait.
//!
//! ```ignore
//! let mut serial: SerialHost<'_, _> = SerialHost::new(my_bus);
//!
//! // from the host controller, once a device was enumerated
//! match serial.attach(&device_info, &mut app) {
//!     Ok(handle) => { /* app was notified with SerialEvent::Connected */ }
//!     Err(AttachError::Unsupported) => { /* some other class driver may take it */ }
//!     Err(error) => { /* ... */ }
//! }
//!
//! // from the host controller's event handler
//! serial.handle_pipe_event(event, &mut app);
//! ```
//!
//! The driver never blocks, except for the control transfers issued by the line configuration methods.
//! It does no locking: see the [`bus`] module for the guarantees the host controller must give.
#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod types;
pub mod bus;
pub mod coding;
pub mod descriptor;
pub mod driver;
pub mod handler;
pub mod instance;
pub mod pipe;
mod dispatch;
mod error;

#[cfg(test)]
mod mock;

use bus::{HostBus, HostEvent};
use coding::{ControlLines, FlowControl, Framing};
use descriptor::{Configuration, DeviceDescriptor, EndpointDescriptor};
use driver::{DriverDescriptor, Family, DRIVERS};
use handler::{CallbackData, SerialEvent, SerialHandler};
use instance::{InstanceHandle, Registry, SerialInstance};
use pipe::ControlPipe;
use types::{DeviceAddress, PipeKind, TransferType};
use usb_device::UsbDirection;

pub use bus::{PipeEvent, PipeEventKind};
pub use error::{AttachError, SerialError};

/// Default number of instance slots
pub const MAX_INSTANCES: usize = 10;

/// Size of the internal buffer used to drain pipes when no receive buffer is registered
pub const USB_TRANSFER_SIZE: usize = 64;

/// Endpoints beyond this index within one interface are not considered
const MAX_ENDPOINTS_PER_INTERFACE: usize = 3;

/// What the host controller knows about a newly enumerated device
#[derive(Copy, Clone)]
pub struct DeviceInfo<'d> {
    pub address: DeviceAddress,
    pub descriptor: DeviceDescriptor,
    /// The full configuration descriptor of the active configuration (including nested descriptors)
    pub configuration: &'d [u8],
}

/// The serial class driver
///
/// Owns the host controller interface (`B`) and up to `N` serial instances. The lifetime `'a` is the lifetime of the
/// driver table and of the receive buffers registered with [`setup_instance`](SerialHost::setup_instance).
pub struct SerialHost<'a, B, const N: usize = MAX_INSTANCES> {
    bus: B,
    drivers: &'a [DriverDescriptor],
    registry: Registry<'a, N>,
    scratch: [u8; USB_TRANSFER_SIZE],
}

impl<'a, B: HostBus, const N: usize> SerialHost<'a, B, N> {
    /// Create a serial driver with the default driver table ([`DRIVERS`])
    pub fn new(bus: B) -> Self {
        Self::with_drivers(bus, &DRIVERS)
    }

    /// Create a serial driver with a custom driver table
    ///
    /// Registers with the host controller once for every distinct interface class in the table.
    pub fn with_drivers(mut bus: B, drivers: &'a [DriverDescriptor]) -> Self {
        for (index, driver) in drivers.iter().enumerate() {
            let class = driver.interface_class;
            if !drivers[..index].iter().any(|earlier| earlier.interface_class == class) {
                debug!("[usbh-serial] Registering for interface class {:#X}", class);
                bus.register_class_driver(class);
            }
        }
        Self {
            bus,
            drivers,
            registry: Registry::new(),
            scratch: [0; USB_TRANSFER_SIZE],
        }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn drivers(&self) -> &'a [DriverDescriptor] {
        self.drivers
    }

    pub fn registry(&self) -> &Registry<'a, N> {
        &self.registry
    }

    /// Access an instance, whether its device is still connected or not
    pub fn instance(&self, handle: InstanceHandle) -> Option<&SerialInstance<'a>> {
        self.registry.slot(handle)
    }

    /// Find the connected instance for the given device
    pub fn instance_for_device(&self, device: DeviceAddress) -> Option<InstanceHandle> {
        self.registry.find_by_device(device)
    }

    /// Take over a newly enumerated device
    ///
    /// The device is matched against the driver table, using the class of its first interface (interface 0,
    /// alternate setting 0) and its vendor and product ids. On success an instance is created, pipes are allocated for
    /// the device's bulk IN, bulk OUT and interrupt IN endpoints, and the handler receives [`SerialEvent::Connected`].
    ///
    /// All interfaces of the configuration are scanned. If there are multiple endpoints of the same kind, the first
    /// one is used. A device that lacks some kind of endpoint is still attached, operations that need the missing
    /// pipe fail with [`SerialError::NoPipe`]. The interrupt IN endpoint is not used with drivers that poll the bulk
    /// IN pipe instead.
    pub fn attach(&mut self, device: &DeviceInfo<'_>, handler: &mut dyn SerialHandler) -> Result<InstanceHandle, AttachError> {
        let configuration = Configuration::parse(device.configuration).ok_or(AttachError::InvalidDescriptor)?;
        let first = configuration.interface(0, 0).ok_or(AttachError::InvalidDescriptor)?;
        let class = first.descriptor.interface_class;
        let vendor_id = device.descriptor.id_vendor;
        let product_id = device.descriptor.id_product;

        let Some(driver_index) = driver::match_driver(self.drivers, class, vendor_id, product_id) else {
            debug!(
                "[usbh-serial] No driver for device {} (class {:#X}, vendor {:#X}, product {:#X})",
                u8::from(device.address),
                class,
                vendor_id,
                product_id,
            );
            return Err(AttachError::Unsupported);
        };
        let driver = self.drivers[driver_index];

        let instance = SerialInstance::new(device.address, device.descriptor.max_packet_size, driver_index);
        let Some(handle) = self.registry.claim(instance) else {
            warn!("[usbh-serial] No instance slot left for device {}", u8::from(device.address));
            return Err(AttachError::RegistryFull);
        };

        for number in 0..configuration.num_interfaces() {
            let Some(interface) = configuration.interface(number, 0) else {
                continue;
            };
            for endpoint in interface.endpoints().take(MAX_ENDPOINTS_PER_INTERFACE) {
                let Some(kind) = pipe_kind(&endpoint) else {
                    continue;
                };
                if kind == PipeKind::InterruptIn && driver.is_polling() {
                    continue;
                }
                let Some(instance) = self.registry.get_mut(handle) else {
                    continue;
                };
                let slot = instance.pipe_mut(kind);
                if slot.is_some() {
                    continue;
                }
                let interval = match kind {
                    PipeKind::BulkIn => driver.bulk_in_interval(),
                    PipeKind::BulkOut => fugit::MillisDurationU32::from_ticks(0),
                    PipeKind::InterruptIn => fugit::MillisDurationU32::from_ticks(endpoint.interval as u32),
                };
                match self.bus.alloc_pipe(kind, device.address, endpoint.max_packet_size, kind.entry()) {
                    Some(pipe) => {
                        self.bus.configure_pipe(pipe, endpoint.max_packet_size, interval, endpoint.address.number());
                        *slot = Some(pipe);
                    }
                    None => warn!(
                        "[usbh-serial] Host controller has no pipe left for {} endpoint {} of device {}",
                        kind,
                        endpoint.address.number(),
                        u8::from(device.address),
                    ),
                }
            }
        }

        info!(
            "[usbh-serial] Device {} attached as instance {} ({})",
            u8::from(device.address),
            handle.index(),
            driver.family,
        );
        handler.global_event(Some(handle), SerialEvent::Connected);
        Ok(handle)
    }

    /// Release a device that was unplugged
    ///
    /// The instance is marked as disconnected, its pipes are freed (interrupt IN, bulk IN, bulk OUT), and if a callback
    /// was registered the handler receives [`SerialEvent::Disconnected`]. The handle is stale afterwards.
    pub fn detach(&mut self, handle: InstanceHandle, handler: &mut dyn SerialHandler) -> Result<(), SerialError> {
        let instance = self.registry.get_mut(handle).ok_or(SerialError::StaleHandle)?;
        instance.device = None;
        instance.connected = false;

        let pipes = [
            instance.interrupt_in.take(),
            instance.bulk_in.take(),
            instance.bulk_out.take(),
        ];
        for pipe in pipes.into_iter().flatten() {
            self.bus.free_pipe(pipe);
        }

        info!("[usbh-serial] Instance {} detached", handle.index());
        if let Some(data) = instance.callback {
            handler.instance_event(handle, SerialEvent::Disconnected, data);
        }
        Ok(())
    }

    /// Register the application's callback data, and optionally a buffer for received data
    ///
    /// Per-instance events are only delivered after this was called. Without a receive buffer, received data is
    /// read into an internal buffer of [`USB_TRANSFER_SIZE`] bytes, and only visible within the
    /// [`SerialEvent::RxAvailable`] event.
    pub fn setup_instance(&mut self, handle: InstanceHandle, data: CallbackData, rx_buffer: Option<&'a mut [u8]>) -> Result<(), SerialError> {
        let instance = self.registry.get_mut(handle).ok_or(SerialError::StaleHandle)?;
        instance.callback = Some(data);
        instance.rx_buffer = rx_buffer;
        Ok(())
    }

    /// Schedule a non-blocking write on the instance's bulk OUT pipe
    ///
    /// Returns the number of bytes accepted by the host controller. Completion is reported as [`SerialEvent::TxComplete`].
    pub fn schedule_write(&mut self, handle: InstanceHandle, data: &[u8]) -> Result<usize, SerialError> {
        let instance = self.registry.get_mut(handle).ok_or(SerialError::StaleHandle)?;
        let pipe = instance.bulk_out.ok_or(SerialError::NoPipe)?;
        instance.last_write_len = data.len();
        Ok(self.bus.schedule_write(pipe, data))
    }

    /// Number of bytes delivered by the last receive event on the bulk IN pipe
    pub fn read_data_count(&self, handle: InstanceHandle) -> Result<u16, SerialError> {
        let instance = self.registry.get(handle).ok_or(SerialError::StaleHandle)?;
        Ok(instance.read_count())
    }

    /// The data delivered by the last receive event on the bulk IN pipe
    ///
    /// Only available if a receive buffer was registered.
    pub fn received(&self, handle: InstanceHandle) -> Option<&[u8]> {
        let instance = self.registry.get(handle)?;
        let buffer = instance.rx_buffer.as_deref()?;
        buffer.get(..instance.bulk_in_len as usize)
    }

    fn control<R>(&mut self, handle: InstanceHandle, operation: impl FnOnce(Family, &mut ControlPipe<'_, B>) -> Result<R, SerialError>) -> Result<R, SerialError> {
        let instance = self.registry.get(handle).ok_or(SerialError::StaleHandle)?;
        let device = instance.device.ok_or(SerialError::StaleHandle)?;
        let max_packet_size = instance.ep0_max_packet_size;
        let family = self.drivers.get(instance.driver).ok_or(SerialError::StaleHandle)?.family;
        let mut control = ControlPipe::new(&mut self.bus, device, max_packet_size);
        operation(family, &mut control)
    }

    /// Family specific initialization (CP210x: enable the UART)
    pub fn init_device(&mut self, handle: InstanceHandle) -> Result<(), SerialError> {
        self.control(handle, |family, control| family.init(control))
    }

    pub fn set_baud(&mut self, handle: InstanceHandle, baud: u32) -> Result<(), SerialError> {
        self.control(handle, |family, control| family.set_baud(control, baud))
    }

    pub fn get_baud(&mut self, handle: InstanceHandle) -> Result<u32, SerialError> {
        self.control(handle, |family, control| family.get_baud(control))
    }

    pub fn set_coding(&mut self, handle: InstanceHandle, framing: Framing) -> Result<(), SerialError> {
        self.control(handle, |family, control| family.set_coding(control, framing))
    }

    pub fn get_coding(&mut self, handle: InstanceHandle) -> Result<Framing, SerialError> {
        self.control(handle, |family, control| family.get_coding(control))
    }

    /// Set baud rate, then framing. Stops at the first failure.
    pub fn set_line_config(&mut self, handle: InstanceHandle, baud: u32, framing: Framing) -> Result<(), SerialError> {
        self.set_baud(handle, baud)?;
        self.set_coding(handle, framing)
    }

    pub fn set_control_line_state(&mut self, handle: InstanceHandle, lines: ControlLines) -> Result<(), SerialError> {
        self.control(handle, |family, control| family.set_control_lines(control, lines))
    }

    pub fn get_control_line_state(&mut self, handle: InstanceHandle) -> Result<ControlLines, SerialError> {
        self.control(handle, |family, control| family.get_control_lines(control))
    }

    pub fn set_flow(&mut self, handle: InstanceHandle, flow: FlowControl) -> Result<(), SerialError> {
        self.control(handle, |family, control| family.set_flow(control, flow))
    }

    pub fn set_break(&mut self, handle: InstanceHandle) -> Result<(), SerialError> {
        self.control(handle, |family, control| family.set_break(control))
    }

    pub fn clear_break(&mut self, handle: InstanceHandle) -> Result<(), SerialError> {
        self.control(handle, |family, control| family.clear_break(control))
    }

    /// Forward host controller events that concern the application rather than a single instance
    pub fn handle_host_event(&mut self, event: HostEvent, handler: &mut dyn SerialHandler) {
        match event {
            HostEvent::UnknownConnected => handler.global_event(None, SerialEvent::UnknownConnected),
            HostEvent::PowerFault => {
                warn!("[usbh-serial] Power fault");
                handler.global_event(None, SerialEvent::PowerFault)
            }
            HostEvent::Connected | HostEvent::Disconnected => trace!("[usbh-serial] Ignoring host event {}", event),
        }
    }
}

/// Kind of pipe needed for the endpoint, or `None` if the serial driver does not use it
fn pipe_kind(endpoint: &EndpointDescriptor) -> Option<PipeKind> {
    match (endpoint.attributes.transfer_type(), endpoint.address.direction()) {
        (TransferType::Bulk, UsbDirection::In) => Some(PipeKind::BulkIn),
        (TransferType::Bulk, UsbDirection::Out) => Some(PipeKind::BulkOut),
        (TransferType::Interrupt, UsbDirection::In) => Some(PipeKind::InterruptIn),
        _ => None,
    }
}
