//! Scoped buffers in the engine's address space
//!
//! Every region the host touches is held by a [`BoundaryBuffer`]. The guard
//! frees its region when dropped, so each acquire is paired with exactly one
//! release on every path out of a transition, early returns and `?` included.
//! Reads go through a live guard and copy the bytes out, which keeps any data
//! the caller retains independent of the engine's memory.

use crate::{
    engine::{Address, BoundaryMemory, Operation},
    error::{ConverterError, Result},
};

/// Allocates, fills, and adopts boundary buffers
pub struct BoundaryAllocator<'e, M: BoundaryMemory + ?Sized> {
    memory: &'e M,
}

impl<'e, M: BoundaryMemory + ?Sized> Clone for BoundaryAllocator<'e, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'e, M: BoundaryMemory + ?Sized> Copy for BoundaryAllocator<'e, M> {}

impl<'e, M: BoundaryMemory + ?Sized> BoundaryAllocator<'e, M> {
    pub fn new(memory: &'e M) -> Self {
        Self { memory }
    }

    pub fn memory(&self) -> &'e M {
        self.memory
    }

    /// Copy `bytes` into a fresh region
    ///
    /// Zero-length input still reserves one byte so the engine always sees a
    /// non-null address; the reported length stays zero.
    pub fn acquire(&self, bytes: &[u8]) -> Result<BoundaryBuffer<'e, M>> {
        let requested = bytes.len().max(1);
        let address = self.memory.malloc(requested);
        if address.is_null() {
            log::warn!("Boundary allocation of {} bytes failed", requested);
            return Err(ConverterError::AllocationFailure { requested });
        }

        // SAFETY: `address` was just returned by `malloc` for at least
        // `bytes.len()` bytes and nobody else holds it.
        unsafe { self.memory.write(address, bytes) };
        log::debug!("Acquired {} bytes at {}", bytes.len(), address);

        Ok(BoundaryBuffer {
            memory: self.memory,
            address,
            len: bytes.len(),
        })
    }

    /// Copy `text` in as a NUL-terminated UTF-8 string
    pub fn acquire_c_string(&self, text: &str) -> Result<BoundaryBuffer<'e, M>> {
        if text.as_bytes().contains(&0) {
            return Err(ConverterError::InvalidText(
                "interior NUL byte would truncate the string".into(),
            ));
        }

        let mut bytes = Vec::with_capacity(text.len() + 1);
        bytes.extend_from_slice(text.as_bytes());
        bytes.push(0);
        self.acquire(&bytes)
    }

    /// Take release ownership of a region the engine allocated for us
    ///
    /// A null address means the engine call that produced it failed.
    ///
    /// # Safety
    ///
    /// `address` must be a caller-owned engine allocation of at least `len`
    /// bytes that no other guard holds.
    pub unsafe fn adopt(
        &self,
        address: Address,
        len: usize,
        operation: Operation,
    ) -> Result<BoundaryBuffer<'e, M>> {
        if address.is_null() {
            log::warn!("Engine {} returned a null result", operation);
            return Err(ConverterError::engine(operation));
        }

        log::debug!("Adopted {} bytes at {} from {}", len, address, operation);
        Ok(BoundaryBuffer {
            memory: self.memory,
            address,
            len,
        })
    }
}

/// An owned region of boundary memory, released on drop
#[must_use = "dropping a boundary buffer releases it immediately"]
pub struct BoundaryBuffer<'e, M: BoundaryMemory + ?Sized> {
    memory: &'e M,
    address: Address,
    len: usize,
}

impl<'e, M: BoundaryMemory + ?Sized> BoundaryBuffer<'e, M> {
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Copy the whole region out
    pub fn read_view(&self) -> Vec<u8> {
        if self.len == 0 {
            return Vec::new();
        }
        // SAFETY: the guard owns `address..address + len` until it drops.
        unsafe { self.memory.read(self.address, self.len) }
    }

    /// Copy `len` bytes starting `offset` bytes into the region
    pub fn read_at(&self, offset: usize, len: usize) -> Result<Vec<u8>> {
        let end = offset
            .checked_add(len)
            .filter(|end| *end <= self.len)
            .ok_or(ConverterError::SizeMismatch {
                expected: offset.saturating_add(len),
                actual: self.len,
            })?;
        let start = self
            .address
            .offset(offset)
            .ok_or(ConverterError::SizeMismatch {
                expected: end,
                actual: self.len,
            })?;

        if len == 0 {
            return Ok(Vec::new());
        }
        // SAFETY: `offset + len <= self.len`, so the read stays inside the region.
        Ok(unsafe { self.memory.read(start, len) })
    }

    /// Release now instead of at end of scope
    pub fn release(self) {
        drop(self);
    }
}

impl<M: BoundaryMemory + ?Sized> Drop for BoundaryBuffer<'_, M> {
    fn drop(&mut self) {
        // SAFETY: the guard is the sole owner and `drop` runs exactly once.
        unsafe { self.memory.free(self.address) };
        log::debug!("Released {} bytes at {}", self.len, self.address);
    }
}

impl<M: BoundaryMemory + ?Sized> std::fmt::Debug for BoundaryBuffer<'_, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundaryBuffer")
            .field("address", &self.address)
            .field("len", &self.len)
            .finish()
    }
}
