//! A flat, 32-bit address space with first-fit allocation

use std::collections::BTreeMap;
use std::ops::Range;

/// First usable address; everything below reads as null
const BASE: usize = 0x100;
const ALIGN: usize = 8;

/// Who is entitled to free a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Owner {
    Caller,
    Engine,
}

#[derive(Debug, Clone, Copy)]
struct Block {
    len: usize,
    span: usize,
    owner: Owner,
}

pub(crate) struct Arena {
    heap: Vec<u8>,
    blocks: BTreeMap<usize, Block>,
    limit: usize,
}

impl Arena {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            heap: Vec::new(),
            blocks: BTreeMap::new(),
            limit: limit.min(u32::MAX as usize),
        }
    }

    /// Reserve `len` zeroed bytes, or `None` past the memory limit
    pub(crate) fn alloc(&mut self, len: usize, owner: Owner) -> Option<usize> {
        let span = len.max(1).checked_add(ALIGN - 1)? / ALIGN * ALIGN;

        let mut cursor = BASE;
        for (&start, block) in &self.blocks {
            if start - cursor >= span {
                break;
            }
            cursor = start + block.span;
        }
        let end = cursor.checked_add(span).filter(|end| *end <= self.limit)?;

        if self.heap.len() < end {
            self.heap.resize(end, 0);
        }
        self.heap[cursor..end].fill(0);
        self.blocks.insert(cursor, Block { len, span, owner });
        Some(cursor)
    }

    /// Release a block; `false` when nothing `owner` may free starts there
    pub(crate) fn free(&mut self, address: usize, owner: Owner) -> bool {
        match self.blocks.get(&address) {
            Some(block) if block.owner == owner => {
                self.blocks.remove(&address);
                true
            },
            _ => false,
        }
    }

    /// Heap range for `address..address + len` if it lies inside one live block
    fn region(&self, address: usize, len: usize) -> Option<Range<usize>> {
        let (&start, block) = self.blocks.range(..=address).next_back()?;
        let end = address.checked_add(len)?;
        (end <= start + block.len).then_some(address..end)
    }

    pub(crate) fn read(&self, address: usize, len: usize) -> Option<&[u8]> {
        self.region(address, len).map(|range| &self.heap[range])
    }

    pub(crate) fn write(&mut self, address: usize, bytes: &[u8]) -> bool {
        match self.region(address, bytes.len()) {
            Some(range) => {
                self.heap[range].copy_from_slice(bytes);
                true
            },
            None => false,
        }
    }

    /// Bytes from `address` up to the first NUL inside the same block
    pub(crate) fn read_c_string(&self, address: usize) -> Option<&[u8]> {
        let (&start, block) = self.blocks.range(..=address).next_back()?;
        let rest = self.heap.get(address..start + block.len)?;
        let nul = rest.iter().position(|b| *b == 0)?;
        Some(&rest[..nul])
    }

    /// Allocate a caller-owned block holding `bytes`
    pub(crate) fn hand_off(&mut self, bytes: &[u8]) -> Option<usize> {
        let address = self.alloc(bytes.len(), Owner::Caller)?;
        self.write(address, bytes);
        Some(address)
    }

    pub(crate) fn live(&self, owner: Owner) -> usize {
        self.blocks.values().filter(|b| b.owner == owner).count()
    }

    pub(crate) fn bytes_in_use(&self) -> usize {
        self.blocks.values().map(|b| b.len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_fit_reuses_freed_gap() {
        let mut arena = Arena::new(1 << 20);
        let a = arena.alloc(16, Owner::Caller).unwrap();
        let b = arena.alloc(16, Owner::Caller).unwrap();
        assert!(a >= BASE);
        assert!(b > a);

        assert!(arena.free(a, Owner::Caller));
        let c = arena.alloc(10, Owner::Caller).unwrap();
        assert_eq!(c, a);
    }

    #[test]
    fn test_limit_is_enforced() {
        let mut arena = Arena::new(BASE + 64);
        assert!(arena.alloc(64, Owner::Caller).is_some());
        assert!(arena.alloc(1, Owner::Caller).is_none());
    }

    #[test]
    fn test_double_free_and_wrong_owner() {
        let mut arena = Arena::new(1 << 20);
        let a = arena.alloc(4, Owner::Engine).unwrap();
        assert!(!arena.free(a, Owner::Caller));
        assert!(arena.free(a, Owner::Engine));
        assert!(!arena.free(a, Owner::Engine));
    }

    #[test]
    fn test_reads_stay_inside_blocks() {
        let mut arena = Arena::new(1 << 20);
        let a = arena.hand_off(b"abc\0def").unwrap();

        assert_eq!(arena.read(a + 4, 3), Some(&b"def"[..]));
        assert_eq!(arena.read(a + 4, 4), None);
        assert_eq!(arena.read_c_string(a), Some(&b"abc"[..]));
        assert_eq!(arena.read_c_string(a + 4), None);
        assert_eq!(arena.read(0, 1), None);
    }

    #[test]
    fn test_reallocated_memory_is_zeroed() {
        let mut arena = Arena::new(1 << 20);
        let a = arena.hand_off(&[9; 8]).unwrap();
        arena.free(a, Owner::Caller);
        let b = arena.alloc(8, Owner::Caller).unwrap();
        assert_eq!(arena.read(b, 8), Some(&[0u8; 8][..]));
    }
}
