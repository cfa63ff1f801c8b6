//! Decoding the engine's `(length, pointer)` result records
//!
//! Import and export both answer with the address of a packed two-word
//! record: a little-endian `u32` length followed by a pointer in the engine's
//! own width. That one address carries two separate release obligations:
//!
//! - the record itself, always freed by the caller
//! - the payload it points at, which depends on the operation
//!
//! [`PayloadOwnership`] states which one applies. A [`DualWordResult`] holds
//! a guard for every region the caller must free, and [`DualWordResult::into_bytes`]
//! copies the payload out before releasing anything.

use crate::{
    boundary::{BoundaryAllocator, BoundaryBuffer},
    engine::{Address, BoundaryMemory, Operation},
    error::{ConverterError, Result},
};

/// Width of the length word at the start of every record
pub const LENGTH_WORD: usize = 4;

/// Who frees the payload a record points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadOwnership {
    /// Payload lives in engine storage, valid until the next engine call
    EngineRetained,
    /// Payload is a separate allocation the caller must release
    CallerReleased,
}

/// Reads result records through a [`BoundaryAllocator`]
pub struct ResultDecoder<'e, M: BoundaryMemory + ?Sized> {
    allocator: BoundaryAllocator<'e, M>,
}

impl<'e, M: BoundaryMemory + ?Sized> ResultDecoder<'e, M> {
    pub fn new(allocator: BoundaryAllocator<'e, M>) -> Self {
        Self { allocator }
    }

    /// Total record size: length word plus one pointer word
    pub fn record_len(&self) -> usize {
        LENGTH_WORD + self.allocator.memory().pointer_width()
    }

    /// Take ownership of the record at `record` and decode it
    ///
    /// The record guard is created first, so every failure past a null check
    /// still releases it.
    ///
    /// # Safety
    ///
    /// `record` must be a caller-owned result record returned by `operation`,
    /// and `ownership` must match that operation's documented contract.
    pub unsafe fn decode(
        &self,
        record: Address,
        ownership: PayloadOwnership,
        operation: Operation,
    ) -> Result<DualWordResult<'e, M>> {
        let record = self.allocator.adopt(record, self.record_len(), operation)?;

        let length = decode_word(&record.read_at(0, LENGTH_WORD)?);
        let length = usize::try_from(length).map_err(|_| ConverterError::engine(operation))?;
        let width = self.allocator.memory().pointer_width();
        if width > std::mem::size_of::<u64>() {
            return Err(ConverterError::InvalidParameter(format!(
                "pointer width of {width} bytes"
            )));
        }
        let pointer = decode_word(&record.read_at(LENGTH_WORD, width)?);
        let data = usize::try_from(pointer)
            .map(Address::new)
            .map_err(|_| ConverterError::engine(operation))?;

        if data.is_null() && length > 0 {
            log::warn!(
                "{} record at {} declares {} bytes at null",
                operation,
                record.address(),
                length
            );
            return Err(ConverterError::engine(operation));
        }

        let payload = match ownership {
            PayloadOwnership::CallerReleased if !data.is_null() => {
                Some(self.allocator.adopt(data, length, operation)?)
            },
            _ => None,
        };

        log::debug!(
            "Decoded {} record at {}: {} bytes at {} ({:?})",
            operation,
            record.address(),
            length,
            data,
            ownership
        );

        Ok(DualWordResult {
            memory: self.allocator.memory(),
            length,
            data,
            ownership,
            record,
            payload,
        })
    }
}

/// Little-endian word of up to eight bytes
fn decode_word(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .rev()
        .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte))
}

/// A decoded result together with its release obligations
pub struct DualWordResult<'e, M: BoundaryMemory + ?Sized> {
    memory: &'e M,
    length: usize,
    data: Address,
    ownership: PayloadOwnership,
    record: BoundaryBuffer<'e, M>,
    payload: Option<BoundaryBuffer<'e, M>>,
}

impl<'e, M: BoundaryMemory + ?Sized> DualWordResult<'e, M> {
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn data_pointer(&self) -> Address {
        self.data
    }

    pub fn ownership(&self) -> PayloadOwnership {
        self.ownership
    }

    /// Copy the payload out without releasing anything
    pub fn read_payload(&self) -> Vec<u8> {
        if let Some(payload) = &self.payload {
            return payload.read_view();
        }
        if self.length == 0 {
            return Vec::new();
        }
        // SAFETY: engine-retained payloads stay valid until the next engine
        // call, and no call can be issued through this result.
        unsafe { self.memory.read(self.data, self.length) }
    }

    /// Read the payload fully, then release the record and the payload
    pub fn into_bytes(self) -> Vec<u8> {
        let bytes = self.read_payload();
        let (record, payload) = self.into_parts();
        record.release();
        if let Some(payload) = payload {
            payload.release();
        }
        bytes
    }

    /// Split into the record guard and, when caller-released, the payload guard
    pub fn into_parts(self) -> (BoundaryBuffer<'e, M>, Option<BoundaryBuffer<'e, M>>) {
        (self.record, self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::FontEngine;
    use crate::testing::MockEngine;

    #[test]
    fn test_decode_word_little_endian() {
        assert_eq!(decode_word(&[0x10, 0x27, 0, 0]), 10_000);
        assert_eq!(decode_word(&[1, 0, 0, 0, 0, 0, 0, 1]), 0x0100_0000_0000_0001);
        assert_eq!(decode_word(&[]), 0);
    }

    #[test]
    fn test_export_record_releases_record_and_payload() {
        let engine = MockEngine::new();
        let allocator = BoundaryAllocator::new(&engine);
        let decoder = ResultDecoder::new(allocator);

        let font = allocator.acquire(b"font").unwrap();
        let name = allocator.acquire_c_string("demo").unwrap();
        let record = unsafe { engine.export_to_c_code(font.address(), font.len(), name.address()) };
        drop((font, name));

        let result =
            unsafe { decoder.decode(record, PayloadOwnership::CallerReleased, Operation::Export) }
                .unwrap();
        assert_eq!(result.len(), b"/* demo */ font".len());
        let bytes = result.into_bytes();

        assert_eq!(bytes, b"/* demo */ font");
        assert_eq!(engine.live(), 0);
        assert_eq!(engine.mallocs() + engine.handoffs(), engine.frees());
        assert_eq!(engine.faults(), 0);
    }

    #[test]
    fn test_import_record_leaves_retained_payload_alone() {
        let engine = MockEngine::new();
        let allocator = BoundaryAllocator::new(&engine);
        let decoder = ResultDecoder::new(allocator);

        let source = allocator.acquire(&[0u8; 32]).unwrap();
        let record = unsafe { engine.import_ttf(source.address(), source.len(), 14, true) };

        let result =
            unsafe { decoder.decode(record, PayloadOwnership::EngineRetained, Operation::Import) }
                .unwrap();
        let bytes = result.into_bytes();
        source.release();

        assert_eq!(bytes, b"enc size=14 mono=1 src=32");
        assert_eq!(engine.live(), 0);
        assert_eq!(engine.faults(), 0);
    }

    #[test]
    fn test_null_record_is_engine_failure() {
        let engine = MockEngine::new();
        let decoder = ResultDecoder::new(BoundaryAllocator::new(&engine));

        let result =
            unsafe { decoder.decode(Address::NULL, PayloadOwnership::CallerReleased, Operation::Export) };
        assert!(matches!(
            result,
            Err(ConverterError::EngineCallFailed {
                operation: Operation::Export
            })
        ));
        assert_eq!(engine.faults(), 0);
    }

    #[test]
    fn test_null_payload_with_length_releases_record() {
        let engine = MockEngine::new();
        let allocator = BoundaryAllocator::new(&engine);
        let decoder = ResultDecoder::new(allocator);

        // A hand-built record claiming 12 bytes at address zero
        let mut words = 12u32.to_le_bytes().to_vec();
        words.extend_from_slice(&0u32.to_le_bytes());
        let record = allocator.acquire(&words).unwrap();
        let address = record.address();
        std::mem::forget(record);

        let result =
            unsafe { decoder.decode(address, PayloadOwnership::CallerReleased, Operation::Export) };
        assert!(result.is_err());
        assert_eq!(engine.live(), 0);
        assert_eq!(engine.faults(), 0);
    }
}
