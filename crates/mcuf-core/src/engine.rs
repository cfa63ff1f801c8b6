//! The contract every font engine speaks across the boundary
//!
//! An engine lives in its own address space. Nothing but flat byte buffers
//! and raw addresses cross over: the host allocates with [`BoundaryMemory::malloc`],
//! copies bytes in, hands the address to one of the [`FontEngine`] operations,
//! and copies results back out before releasing every region it owns.
//!
//! Most methods here are `unsafe` because an address is only meaningful to the
//! engine that produced it. The guards in [`crate::boundary`] and
//! [`crate::result`] are the only callers inside this crate, and they only
//! pass addresses they own.
//!
//! ```ignore
//! struct MyEngine { /* handle to the foreign module */ }
//!
//! impl BoundaryMemory for MyEngine {
//!     fn pointer_width(&self) -> usize { 4 }
//!     fn malloc(&self, len: usize) -> Address { /* ... */ }
//!     unsafe fn free(&self, address: Address) { /* ... */ }
//!     unsafe fn write(&self, address: Address, bytes: &[u8]) { /* ... */ }
//!     unsafe fn read(&self, address: Address, len: usize) -> Vec<u8> { /* ... */ }
//! }
//! ```

use std::fmt;

/// A raw location inside the engine's address space
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(usize);

impl Address {
    pub const NULL: Address = Address(0);

    pub const fn new(raw: usize) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> usize {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Step forward by `bytes`, or `None` if that leaves the address space
    pub fn offset(self, bytes: usize) -> Option<Address> {
        self.0.checked_add(bytes).map(Address)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// The four engine operations, used for logging and error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Import,
    Optimize,
    Render,
    Export,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Import => "import",
            Operation::Optimize => "optimize",
            Operation::Render => "render",
            Operation::Export => "export",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw memory primitives of the engine's address space
pub trait BoundaryMemory {
    /// Size in bytes of a pointer word as the engine lays it out
    fn pointer_width(&self) -> usize;

    /// Allocate `len` bytes; [`Address::NULL`] when memory is exhausted
    fn malloc(&self, len: usize) -> Address;

    /// Release a region obtained from `malloc` or handed over by the engine
    ///
    /// # Safety
    ///
    /// `address` must be a live region the caller owns, released exactly once.
    unsafe fn free(&self, address: Address);

    /// Copy `bytes` into the region starting at `address`
    ///
    /// # Safety
    ///
    /// `address..address + bytes.len()` must lie inside a live region.
    unsafe fn write(&self, address: Address, bytes: &[u8]);

    /// Copy `len` bytes out of the region starting at `address`
    ///
    /// # Safety
    ///
    /// `address..address + len` must lie inside memory that is still valid.
    unsafe fn read(&self, address: Address, len: usize) -> Vec<u8>;
}

/// The external font-processing engine
///
/// All font semantics live behind this trait. Calls are synchronous and run
/// to completion. Results come back in one of two shapes: a two-word
/// `(length, pointer)` record (import, export) or a bare pointer (render).
pub trait FontEngine: BoundaryMemory {
    /// Whether the engine module has finished loading
    fn is_ready(&self) -> bool {
        true
    }

    /// Rasterize a TrueType font into the bitmap encoding
    ///
    /// Returns the address of a `(length, pointer)` record. The record must
    /// be freed by the caller; the payload stays in engine storage until the
    /// next import.
    ///
    /// # Safety
    ///
    /// `font` must address `len` readable bytes.
    unsafe fn import_ttf(
        &self,
        font: Address,
        len: usize,
        target_size: u32,
        monochrome: bool,
    ) -> Address;

    /// Shrink the encoding at `buffer` in place
    ///
    /// # Safety
    ///
    /// `buffer` must address `len` writable bytes.
    unsafe fn optimize(&self, buffer: Address, len: usize, iterations: u32);

    /// Render NUL-terminated `text` at `width` pixels wide
    ///
    /// Returns a caller-owned grayscale image of `width * result_height()` bytes.
    ///
    /// # Safety
    ///
    /// `font` must address `len` readable bytes and `text` a NUL-terminated string.
    unsafe fn render(&self, font: Address, len: usize, width: u32, text: Address) -> Address;

    /// Height of the image produced by the most recent `render`
    fn result_height(&self) -> u32;

    /// Generate C source for the encoding, named after NUL-terminated `identifier`
    ///
    /// Returns the address of a `(length, pointer)` record. Record and payload
    /// are both caller-owned and released separately.
    ///
    /// # Safety
    ///
    /// `font` must address `len` readable bytes and `identifier` a NUL-terminated string.
    unsafe fn export_to_c_code(&self, font: Address, len: usize, identifier: Address) -> Address;
}
