//! A small in-memory engine for the unit tests of this crate

use crate::engine::{Address, BoundaryMemory, FontEngine, Operation};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

#[derive(Default)]
struct Heap {
    live: HashMap<usize, Vec<u8>>,
    retained: Option<(usize, Vec<u8>)>,
    next: usize,
}

pub(crate) struct MockEngine {
    heap: RefCell<Heap>,
    mallocs: Cell<usize>,
    handoffs: Cell<usize>,
    frees: Cell<usize>,
    faults: Cell<usize>,
    calls: RefCell<Vec<Operation>>,
    fail_alloc: Cell<bool>,
    fail_next: Cell<Option<Operation>>,
    ready: Cell<bool>,
    height: Cell<u32>,
    iterations: Cell<Option<u32>>,
}

impl MockEngine {
    pub(crate) fn new() -> Self {
        Self {
            heap: RefCell::new(Heap {
                next: 0x1000,
                ..Heap::default()
            }),
            mallocs: Cell::new(0),
            handoffs: Cell::new(0),
            frees: Cell::new(0),
            faults: Cell::new(0),
            calls: RefCell::new(Vec::new()),
            fail_alloc: Cell::new(false),
            fail_next: Cell::new(None),
            ready: Cell::new(true),
            height: Cell::new(0),
            iterations: Cell::new(None),
        }
    }

    pub(crate) fn live(&self) -> usize {
        self.heap.borrow().live.len()
    }

    pub(crate) fn mallocs(&self) -> usize {
        self.mallocs.get()
    }

    /// Regions the engine allocated and handed to the caller to release
    pub(crate) fn handoffs(&self) -> usize {
        self.handoffs.get()
    }

    pub(crate) fn frees(&self) -> usize {
        self.frees.get()
    }

    pub(crate) fn faults(&self) -> usize {
        self.faults.get()
    }

    pub(crate) fn calls(&self) -> Vec<Operation> {
        self.calls.borrow().clone()
    }

    pub(crate) fn fail_allocations(&self, fail: bool) {
        self.fail_alloc.set(fail);
    }

    pub(crate) fn fail_next(&self, operation: Operation) {
        self.fail_next.set(Some(operation));
    }

    /// Limit passed to the most recent optimize call
    pub(crate) fn last_iterations(&self) -> Option<u32> {
        self.iterations.get()
    }

    pub(crate) fn set_ready(&self, ready: bool) {
        self.ready.set(ready);
    }

    fn place(&self, bytes: Vec<u8>) -> usize {
        let mut heap = self.heap.borrow_mut();
        let address = heap.next;
        heap.next += bytes.len().max(1) + 0x10;
        heap.live.insert(address, bytes);
        address
    }

    fn hand_off(&self, bytes: Vec<u8>) -> Address {
        self.handoffs.set(self.handoffs.get() + 1);
        Address::new(self.place(bytes))
    }

    fn record(&self, len: usize, pointer: usize) -> Address {
        let mut bytes = (len as u32).to_le_bytes().to_vec();
        bytes.extend_from_slice(&(pointer as u32).to_le_bytes());
        self.hand_off(bytes)
    }

    fn string_at(&self, address: Address) -> Vec<u8> {
        let heap = self.heap.borrow();
        match heap.live.get(&address.get()) {
            Some(bytes) => bytes.iter().copied().take_while(|b| *b != 0).collect(),
            None => {
                self.faults.set(self.faults.get() + 1);
                Vec::new()
            },
        }
    }

    fn begin(&self, operation: Operation) -> bool {
        self.calls.borrow_mut().push(operation);
        if self.fail_next.get() == Some(operation) {
            self.fail_next.set(None);
            return false;
        }
        true
    }
}

impl BoundaryMemory for MockEngine {
    fn pointer_width(&self) -> usize {
        4
    }

    fn malloc(&self, len: usize) -> Address {
        if self.fail_alloc.get() {
            return Address::NULL;
        }
        self.mallocs.set(self.mallocs.get() + 1);
        Address::new(self.place(vec![0; len]))
    }

    unsafe fn free(&self, address: Address) {
        if self.heap.borrow_mut().live.remove(&address.get()).is_some() {
            self.frees.set(self.frees.get() + 1);
        } else {
            self.faults.set(self.faults.get() + 1);
        }
    }

    unsafe fn write(&self, address: Address, bytes: &[u8]) {
        let mut heap = self.heap.borrow_mut();
        match heap.live.get_mut(&address.get()) {
            Some(region) if region.len() >= bytes.len() => {
                region[..bytes.len()].copy_from_slice(bytes)
            },
            _ => self.faults.set(self.faults.get() + 1),
        }
    }

    unsafe fn read(&self, address: Address, len: usize) -> Vec<u8> {
        let heap = self.heap.borrow();
        let at = address.get();
        let regions = heap
            .live
            .iter()
            .map(|(base, bytes)| (*base, bytes))
            .chain(heap.retained.iter().map(|(base, bytes)| (*base, bytes)));
        for (base, bytes) in regions {
            if at >= base && at + len <= base + bytes.len() {
                return bytes[at - base..at - base + len].to_vec();
            }
        }
        self.faults.set(self.faults.get() + 1);
        vec![0; len]
    }
}

impl FontEngine for MockEngine {
    fn is_ready(&self) -> bool {
        self.ready.get()
    }

    unsafe fn import_ttf(&self, font: Address, len: usize, size: u32, mono: bool) -> Address {
        if !self.begin(Operation::Import) {
            return Address::NULL;
        }
        let source = self.read(font, len);
        let payload = format!("enc size={} mono={} src={}", size, u8::from(mono), source.len());
        let payload = payload.into_bytes();

        let base = {
            let mut heap = self.heap.borrow_mut();
            let base = heap.next;
            heap.next += payload.len() + 0x10;
            heap.retained = Some((base, payload.clone()));
            base
        };
        self.record(payload.len(), base)
    }

    unsafe fn optimize(&self, buffer: Address, len: usize, iterations: u32) {
        self.iterations.set(Some(iterations));
        if !self.begin(Operation::Optimize) || len < 3 {
            return;
        }
        self.write(buffer, b"opt");
    }

    unsafe fn render(&self, font: Address, len: usize, width: u32, text: Address) -> Address {
        if !self.begin(Operation::Render) {
            return Address::NULL;
        }
        let font = self.read(font, len);
        let text = self.string_at(text);
        let height = 3u32;
        self.height.set(height);

        let pixels = (0..(width * height) as usize)
            .map(|i| ((font.len() + text.len() + i) % 256) as u8)
            .collect();
        self.hand_off(pixels)
    }

    fn result_height(&self) -> u32 {
        self.height.get()
    }

    unsafe fn export_to_c_code(&self, font: Address, len: usize, identifier: Address) -> Address {
        if !self.begin(Operation::Export) {
            return Address::NULL;
        }
        let font = self.read(font, len);
        let mut code = b"/* ".to_vec();
        code.extend(self.string_at(identifier));
        code.extend_from_slice(b" */ ");
        code.extend(font);

        let code_len = code.len();
        let payload = self.hand_off(code);
        self.record(code_len, payload.get())
    }
}
