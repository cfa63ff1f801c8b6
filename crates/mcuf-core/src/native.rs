//! In-process engine backed by a linked `mcufont_converter` library
//!
//! Host and engine share one address space here, so an [`Address`] is a real
//! pointer and the pointer width is the host's own. Enabled with the `native`
//! feature.

use crate::engine::{Address, BoundaryMemory, FontEngine};
use std::marker::PhantomData;

mod ffi {
    use std::os::raw::{c_char, c_int, c_void};

    #[link(name = "mcufont_converter")]
    extern "C" {
        pub fn import_ttf(
            font_data: *const u8,
            font_data_size: usize,
            out_font_size: u32,
            monochrome: bool,
        ) -> *mut c_void;
        pub fn optimize(datafile: *const u8, datafile_size: usize, limit: c_int);
        pub fn render(
            datafile: *const u8,
            datafile_size: usize,
            image_width: u32,
            preview_text: *const c_char,
        ) -> *mut u8;
        pub fn get_result_height() -> c_int;
        pub fn export_to_c_code(
            datafile: *const u8,
            datafile_size: usize,
            font_name: *const c_char,
        ) -> *mut c_void;
    }

    extern "C" {
        pub fn malloc(size: usize) -> *mut c_void;
        pub fn free(ptr: *mut c_void);
    }
}

/// The linked converter library
///
/// The library keeps the last render height and the last import result in
/// process-global state, so this handle is neither `Send` nor `Sync`.
#[derive(Debug, Default)]
pub struct NativeEngine {
    _global_state: PhantomData<*const ()>,
}

impl NativeEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BoundaryMemory for NativeEngine {
    fn pointer_width(&self) -> usize {
        std::mem::size_of::<usize>()
    }

    fn malloc(&self, len: usize) -> Address {
        // SAFETY: plain C allocation; a null return is reported as `Address::NULL`.
        let ptr = unsafe { ffi::malloc(len) };
        Address::new(ptr as usize)
    }

    unsafe fn free(&self, address: Address) {
        ffi::free(address.get() as *mut _);
    }

    unsafe fn write(&self, address: Address, bytes: &[u8]) {
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), address.get() as *mut u8, bytes.len());
    }

    unsafe fn read(&self, address: Address, len: usize) -> Vec<u8> {
        std::slice::from_raw_parts(address.get() as *const u8, len).to_vec()
    }
}

impl FontEngine for NativeEngine {
    unsafe fn import_ttf(
        &self,
        font: Address,
        len: usize,
        target_size: u32,
        monochrome: bool,
    ) -> Address {
        let record = ffi::import_ttf(font.get() as *const u8, len, target_size, monochrome);
        Address::new(record as usize)
    }

    unsafe fn optimize(&self, buffer: Address, len: usize, iterations: u32) {
        // A zero limit never terminates inside the library
        let limit = i32::try_from(iterations.max(1)).unwrap_or(i32::MAX);
        ffi::optimize(buffer.get() as *const u8, len, limit);
    }

    unsafe fn render(&self, font: Address, len: usize, width: u32, text: Address) -> Address {
        let image = ffi::render(font.get() as *const u8, len, width, text.get() as *const _);
        Address::new(image as usize)
    }

    fn result_height(&self) -> u32 {
        // SAFETY: reads a plain integer the library updates on every render.
        let height = unsafe { ffi::get_result_height() };
        u32::try_from(height).unwrap_or(0)
    }

    unsafe fn export_to_c_code(&self, font: Address, len: usize, identifier: Address) -> Address {
        let record = ffi::export_to_c_code(font.get() as *const u8, len, identifier.get() as *const _);
        Address::new(record as usize)
    }
}
