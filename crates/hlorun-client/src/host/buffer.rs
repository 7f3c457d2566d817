//! Host-memory device buffers and per-device memory accounting.

use crate::client::DeviceBuffer;
use crate::device::Device;
use crate::future::{ReadyFuture, ReadyPromise};
use crate::{Error, Result};
use hlorun_core::{Literal, Shape};
use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

/// Memory pool of one host device.
#[derive(Debug)]
pub(crate) struct DeviceMemory {
    capacity: Option<usize>,
    in_use: AtomicUsize,
}

impl DeviceMemory {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            capacity,
            in_use: AtomicUsize::new(0),
        }
    }

    /// Reserve `bytes`, released when the reservation is dropped.
    pub fn reserve(self: &Arc<Self>, bytes: usize, device: &Device) -> Result<Reservation> {
        let mut current = self.in_use.load(Ordering::Relaxed);
        loop {
            let requested = current + bytes;
            if let Some(capacity) = self.capacity.filter(|&capacity| requested > capacity) {
                return Err(Error::ResourceExhausted(format!(
                    "allocating {bytes} bytes on {device} would exceed its {capacity} byte capacity \
                     ({current} bytes in use)"
                )));
            }
            match self.in_use.compare_exchange_weak(
                current,
                requested,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    return Ok(Reservation {
                        memory: Arc::clone(self),
                        bytes,
                    });
                }
                Err(actual) => current = actual,
            }
        }
    }

    pub fn in_use(&self) -> usize {
        self.in_use.load(Ordering::Acquire)
    }
}

/// Bytes held on a device for the lifetime of a buffer.
#[derive(Debug)]
pub(crate) struct Reservation {
    memory: Arc<DeviceMemory>,
    bytes: usize,
}

impl Drop for Reservation {
    fn drop(&mut self) {
        self.memory.in_use.fetch_sub(self.bytes, Ordering::AcqRel);
    }
}

/// Device buffer of the [`HostClient`](super::HostClient).
///
/// The data slot is written exactly once, by whoever holds the matching
/// [`BufferWriter`], and only then is the ready future resolved.
#[derive(Debug)]
pub struct HostBuffer {
    shape: Shape,
    device: Device,
    data: Arc<OnceLock<Vec<u8>>>,
    ready: ReadyFuture,
    _reservation: Reservation,
}

/// Producer half of a pending [`HostBuffer`].
pub(crate) struct BufferWriter {
    data: Arc<OnceLock<Vec<u8>>>,
    promise: ReadyPromise,
}

impl BufferWriter {
    /// Store the data and mark the buffer ready.
    pub fn complete(self, bytes: Vec<u8>) {
        match self.data.set(bytes) {
            Ok(()) => self.promise.set_ready(),
            Err(_) => self
                .promise
                .set_error(Error::Internal("buffer written twice".to_string())),
        }
    }
}

impl HostBuffer {
    /// Buffer whose data arrives later through the returned writer.
    pub(crate) fn pending(
        shape: Shape,
        device: Device,
        reservation: Reservation,
    ) -> (Self, BufferWriter) {
        let data = Arc::new(OnceLock::new());
        let (promise, ready) = ReadyFuture::pair();
        let buffer = Self {
            shape,
            device,
            data: Arc::clone(&data),
            ready,
            _reservation: reservation,
        };
        (buffer, BufferWriter { data, promise })
    }

    /// Buffer that is ready on creation.
    pub(crate) fn ready(
        shape: Shape,
        device: Device,
        bytes: Vec<u8>,
        reservation: Reservation,
    ) -> Self {
        let (buffer, writer) = Self::pending(shape, device, reservation);
        writer.complete(bytes);
        buffer
    }

    /// Wait for the buffer and borrow its bytes.
    pub(crate) fn bytes(&self) -> Result<&[u8]> {
        self.ready.block_until_ready()?;
        self.data
            .get()
            .map(Vec::as_slice)
            .ok_or_else(|| Error::Internal(format!("buffer on {} has no data", self.device)))
    }
}

impl DeviceBuffer for HostBuffer {
    fn on_device_shape(&self) -> &Shape {
        &self.shape
    }

    fn device(&self) -> &Device {
        &self.device
    }

    fn ready_future(&self) -> ReadyFuture {
        self.ready.clone()
    }

    fn to_literal_sync(&self) -> Result<Literal> {
        let bytes = self.bytes()?;
        Ok(Literal::from_raw(self.shape.clone(), bytes.to_vec())?)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
