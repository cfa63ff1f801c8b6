//! Font input and generated-source output

use crate::error::{ConverterError, Result};
use std::path::Path;

/// MIME type of the generated source download
pub const SOURCE_MIME_TYPE: &str = "application/octet-stream";

/// Raw TTF bytes and the name they were picked under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontSource {
    name: String,
    bytes: Vec<u8>,
}

impl FontSource {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read a font file, keeping its file name for export naming
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                ConverterError::InvalidParameter(format!("no file name in {}", path.display()))
            })?
            .to_string();
        let bytes = std::fs::read(path)?;
        log::debug!("Read {} bytes from {}", bytes.len(), path.display());
        Ok(Self { name, bytes })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// `name` without its last extension: `Font.Bold.ttf` → `Font.Bold`
pub fn file_stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(dot) => {
            let ext = &name[dot + 1..];
            if ext.is_empty() || ext.contains('/') {
                name
            } else {
                &name[..dot]
            }
        },
        None => name,
    }
}

/// Identifier handed to the engine: `<stem><size>bw`
pub fn export_identifier(source_name: &str, font_size: u32) -> String {
    format!("{}{}bw", file_stem(source_name), font_size)
}

/// Generated C source ready to be saved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedSource {
    identifier: String,
    bytes: Vec<u8>,
}

impl ExportedSource {
    pub fn new(identifier: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            identifier: identifier.into(),
            bytes,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Download name: the identifier with a `.c` suffix
    pub fn file_name(&self) -> String {
        format!("{}.c", self.identifier)
    }

    pub fn mime_type(&self) -> &'static str {
        SOURCE_MIME_TYPE
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Write into `dir` under [`Self::file_name`], returning the full path
    pub fn write_to_dir(&self, dir: impl AsRef<Path>) -> Result<std::path::PathBuf> {
        let path = dir.as_ref().join(self.file_name());
        std::fs::write(&path, &self.bytes)?;
        log::info!("Wrote {} bytes to {}", self.bytes.len(), path.display());
        Ok(path)
    }
}
