//! Simulated Engine - the converter contract without the converter
//!
//! Runs in-process over its own 32-bit address space, so the host-side
//! marshalling is exercised exactly as it would be against a foreign module.
//! The encoding is a deterministic stand-in and the preview is a row of ink
//! boxes, but ownership, record layout and failure signals all follow the
//! real engine:
//!
//! - import answers with a caller-owned record; the payload stays in engine
//!   storage and is discarded at the next import
//! - render answers with a caller-owned `width × height` image
//! - export answers with a caller-owned record and a caller-owned payload
//! - any failure is a null address
//!
//! Every allocation and release is counted, and bad frees or out-of-bounds
//! reads are recorded as faults instead of crashing.

mod arena;
mod encoding;

use arena::{Arena, Owner};
use encoding::{wrap, SimFont};
use mcuf_core::{Address, BoundaryMemory, FontEngine, Operation};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Default address space size
pub const DEFAULT_MEMORY_LIMIT: usize = 16 * 1024 * 1024;

/// Byte width of a pointer in the simulated address space
pub const POINTER_WIDTH: usize = 4;

/// Allocation accounting for caller-visible memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SimStats {
    /// Caller-owned regions still live
    pub outstanding: usize,
    /// Regions handed to the caller, by `malloc` or as a result
    pub allocated: usize,
    /// Regions the caller released
    pub released: usize,
    /// Invalid frees, reads and writes
    pub faults: usize,
    /// Bytes held by live regions of either owner
    pub bytes_in_use: usize,
}

impl SimStats {
    /// No leaks and no faults
    pub fn is_balanced(&self) -> bool {
        self.outstanding == 0 && self.allocated == self.released && self.faults == 0
    }
}

struct State {
    arena: Arena,
    retained: Option<usize>,
    height: u32,
    allocated: usize,
    released: usize,
    faults: usize,
    calls: Vec<Operation>,
    fail_next: Option<Operation>,
}

impl State {
    fn fault(&mut self, what: &str, address: usize) {
        self.faults += 1;
        log::warn!("SimEngine: invalid {} at {:#x}", what, address);
    }

    fn begin(&mut self, operation: Operation) -> bool {
        self.calls.push(operation);
        if self.fail_next == Some(operation) {
            self.fail_next = None;
            log::debug!("SimEngine: injected {} failure", operation);
            return false;
        }
        true
    }

    fn read(&mut self, address: Address, len: usize) -> Option<Vec<u8>> {
        let bytes = self.arena.read(address.get(), len).map(<[u8]>::to_vec);
        if bytes.is_none() {
            self.fault("read", address.get());
        }
        bytes
    }

    fn read_c_string(&mut self, address: Address) -> Option<String> {
        let text = self
            .arena
            .read_c_string(address.get())
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned());
        if text.is_none() {
            self.fault("string read", address.get());
        }
        text
    }

    fn hand_off(&mut self, bytes: &[u8]) -> Option<usize> {
        let address = self.arena.hand_off(bytes)?;
        self.allocated += 1;
        Some(address)
    }

    /// Caller-owned `(length, pointer)` record
    fn record(&mut self, len: usize, pointer: usize) -> Option<usize> {
        let mut words = u32::try_from(len).ok()?.to_le_bytes().to_vec();
        words.extend_from_slice(&u32::try_from(pointer).ok()?.to_le_bytes());
        self.hand_off(&words)
    }

    fn import(&mut self, ttf: &[u8], size: u32, monochrome: bool) -> Option<usize> {
        if let Some(previous) = self.retained.take() {
            self.arena.free(previous, Owner::Engine);
        }
        let font = SimFont::from_ttf(ttf, size, monochrome)?;
        let encoded = font.to_bytes();

        let payload = self.arena.alloc(encoded.len(), Owner::Engine)?;
        self.arena.write(payload, &encoded);
        self.retained = Some(payload);
        log::debug!(
            "SimEngine: imported {} bytes into a {} byte encoding",
            ttf.len(),
            encoded.len()
        );
        self.record(encoded.len(), payload)
    }

    fn render(&mut self, font: &SimFont, width: u32, text: &str) -> Option<usize> {
        let lines = wrap(font, text, width.saturating_sub(2));
        let line_height = font.line_height();
        let height = (lines.len() as u32).checked_mul(line_height)?.checked_add(4)?;
        self.height = height;

        let width = width as usize;
        let mut image = vec![255u8; width.checked_mul(height as usize)?];
        for (row, line) in lines.iter().enumerate() {
            let top = row * line_height as usize;
            let mut pen = 0usize;
            for ch in line.chars() {
                let advance = font.advance(ch) as usize;
                if ch != ' ' {
                    let columns = (pen + 1)..(pen + advance).saturating_sub(1).min(width);
                    for y in (top + 2)..(top + line_height as usize).saturating_sub(1) {
                        for x in columns.clone() {
                            image[y * width + x] = font.ink();
                        }
                    }
                }
                pen += advance;
            }
        }
        self.hand_off(&image)
    }

    fn export(&mut self, font: &SimFont, identifier: &str) -> Option<usize> {
        let code = c_source(font, identifier);
        let payload = self.hand_off(code.as_bytes())?;
        self.record(code.len(), payload)
    }
}

fn c_source(font: &SimFont, identifier: &str) -> String {
    let widths: Vec<String> = font.widths().iter().map(u8::to_string).collect();
    let rows: Vec<String> = widths.chunks(16).map(|row| row.join(", ")).collect();
    format!(
        "/* Font {id}, {size} px, {style}, {passes} optimization passes */\n\
         \n\
         #include \"mf_rlefont.h\"\n\
         \n\
         static const uint8_t mf_rlefont_{id}_widths[{count}] = {{\n    {rows},\n}};\n\
         \n\
         const struct mf_rlefont_s mf_rlefont_{id} = {{\n\
         \x20   .font = {{ .full_name = \"{id}\", .height = {size}, .line_height = {size} }},\n\
         \x20   .widths = mf_rlefont_{id}_widths,\n\
         \x20   .checksum = 0x{digest:016x}ULL,\n\
         }};\n",
        id = identifier,
        size = font.size,
        style = if font.monochrome { "monochrome" } else { "antialiased" },
        passes = font.passes,
        count = widths.len(),
        rows = rows.join(",\n    "),
        digest = font.digest,
    )
}

/// The simulated converter engine
///
/// ```
/// use mcuf_core::{ConverterSettings, FontSource, PipelineController};
/// use mcuf_engine_sim::SimEngine;
///
/// let settings = ConverterSettings { optimize: false, ..Default::default() };
/// let mut pipeline = PipelineController::with_settings(SimEngine::new(), settings)?;
/// pipeline.import(FontSource::new("demo.ttf", vec![0, 1, 0, 0, 42]))?;
/// assert_eq!(pipeline.export()?.file_name(), "demo14bw.c");
/// assert!(pipeline.engine().stats().is_balanced());
/// # Ok::<(), mcuf_core::ConverterError>(())
/// ```
pub struct SimEngine {
    state: Mutex<State>,
    ready: AtomicBool,
}

impl SimEngine {
    pub fn new() -> Self {
        Self::with_memory_limit(DEFAULT_MEMORY_LIMIT)
    }

    /// An engine whose address space ends at `limit` bytes
    pub fn with_memory_limit(limit: usize) -> Self {
        Self {
            state: Mutex::new(State {
                arena: Arena::new(limit),
                retained: None,
                height: 0,
                allocated: 0,
                released: 0,
                faults: 0,
                calls: Vec::new(),
                fail_next: None,
            }),
            ready: AtomicBool::new(true),
        }
    }

    /// An engine that reports not ready until [`Self::mark_ready`]
    pub fn loading() -> Self {
        let engine = Self::new();
        engine.ready.store(false, Ordering::Release);
        engine
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
        log::info!("SimEngine: ready");
    }

    /// Make the next call of `operation` fail with a null result
    pub fn fail_next(&self, operation: Operation) {
        self.state.lock().fail_next = Some(operation);
    }

    /// Engine operations in call order
    pub fn calls(&self) -> Vec<Operation> {
        self.state.lock().calls.clone()
    }

    pub fn stats(&self) -> SimStats {
        let state = self.state.lock();
        SimStats {
            outstanding: state.arena.live(Owner::Caller),
            allocated: state.allocated,
            released: state.released,
            faults: state.faults,
            bytes_in_use: state.arena.bytes_in_use(),
        }
    }
}

impl Default for SimEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl BoundaryMemory for SimEngine {
    fn pointer_width(&self) -> usize {
        POINTER_WIDTH
    }

    fn malloc(&self, len: usize) -> Address {
        let mut state = self.state.lock();
        match state.arena.alloc(len, Owner::Caller) {
            Some(address) => {
                state.allocated += 1;
                Address::new(address)
            },
            None => {
                log::debug!("SimEngine: out of memory for {} bytes", len);
                Address::NULL
            },
        }
    }

    unsafe fn free(&self, address: Address) {
        let mut state = self.state.lock();
        if state.arena.free(address.get(), Owner::Caller) {
            state.released += 1;
        } else {
            state.fault("free", address.get());
        }
    }

    unsafe fn write(&self, address: Address, bytes: &[u8]) {
        let mut state = self.state.lock();
        if !state.arena.write(address.get(), bytes) {
            state.fault("write", address.get());
        }
    }

    unsafe fn read(&self, address: Address, len: usize) -> Vec<u8> {
        self.state
            .lock()
            .read(address, len)
            .unwrap_or_else(|| vec![0; len])
    }
}

impl FontEngine for SimEngine {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    unsafe fn import_ttf(
        &self,
        font: Address,
        len: usize,
        target_size: u32,
        monochrome: bool,
    ) -> Address {
        let mut state = self.state.lock();
        if !state.begin(Operation::Import) {
            return Address::NULL;
        }
        let record = state
            .read(font, len)
            .and_then(|ttf| state.import(&ttf, target_size, monochrome));
        Address::new(record.unwrap_or(0))
    }

    unsafe fn optimize(&self, buffer: Address, len: usize, iterations: u32) {
        let mut state = self.state.lock();
        if !state.begin(Operation::Optimize) {
            return;
        }
        let Some(mut font) = state.read(buffer, len).and_then(|b| SimFont::parse(&b)) else {
            log::warn!("SimEngine: nothing to optimize at {}", buffer);
            return;
        };
        font.optimize(iterations);
        let bytes = font.to_bytes();
        if bytes.len() == len {
            state.arena.write(buffer.get(), &bytes);
        }
        log::debug!("SimEngine: {} optimization passes", font.passes);
    }

    unsafe fn render(&self, font: Address, len: usize, width: u32, text: Address) -> Address {
        let mut state = self.state.lock();
        state.height = 0;
        if !state.begin(Operation::Render) {
            return Address::NULL;
        }
        let Some(font) = state.read(font, len).and_then(|b| SimFont::parse(&b)) else {
            return Address::NULL;
        };
        let Some(text) = state.read_c_string(text) else {
            return Address::NULL;
        };
        Address::new(state.render(&font, width, &text).unwrap_or(0))
    }

    fn result_height(&self) -> u32 {
        self.state.lock().height
    }

    unsafe fn export_to_c_code(&self, font: Address, len: usize, identifier: Address) -> Address {
        let mut state = self.state.lock();
        if !state.begin(Operation::Export) {
            return Address::NULL;
        }
        let Some(font) = state.read(font, len).and_then(|b| SimFont::parse(&b)) else {
            return Address::NULL;
        };
        let Some(identifier) = state.read_c_string(identifier) else {
            return Address::NULL;
        };
        Address::new(state.export(&font, &identifier).unwrap_or(0))
    }
}
