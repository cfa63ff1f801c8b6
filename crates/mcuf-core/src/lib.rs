//! Mcuf Core: a TrueType font in, microcontroller C source out
//!
//! The font work itself happens inside an external engine that only speaks
//! in raw addresses and flat byte buffers. This crate is everything on the
//! host side of that boundary.
//!
//! ## The Pipeline
//!
//! 1. **Import** - TTF bytes become the engine's bitmap encoding
//! 2. **Optimize** - Optionally, the encoding shrinks in place
//! 3. **Preview** - Sample text renders into a grayscale image, composed to RGBA
//! 4. **Export** - The encoding becomes a named `.c` file
//!
//! ## Drive It
//!
//! ```rust,ignore
//! use mcuf_core::{ConverterSettings, FontSource, PipelineController};
//!
//! let settings = ConverterSettings { optimize: false, ..Default::default() };
//! let mut pipeline = PipelineController::with_settings(engine, settings)?;
//!
//! let report = pipeline.import(FontSource::from_path("testfont.ttf")?)?;
//! let preview = report.preview?;
//! println!("{}x{} preview", preview.width(), preview.height());
//!
//! let code = pipeline.export()?;
//! assert_eq!(code.file_name(), "testfont14bw.c");
//! ```
//!
//! ## Plug In An Engine
//!
//! Implement [`BoundaryMemory`] and [`FontEngine`]. Buffers crossing over
//! are always held by a [`BoundaryBuffer`] guard, and two-word result
//! records go through [`ResultDecoder`], so an engine never sees a region
//! freed twice or leaked.

pub mod boundary;
pub mod compositor;
pub mod engine;
pub mod error;
#[cfg(feature = "native")]
pub mod native;
pub mod pipeline;
pub mod result;
pub mod settings;
pub mod source;
pub mod state;

#[cfg(test)]
mod proptests;
#[cfg(test)]
mod testing;

pub use boundary::{BoundaryAllocator, BoundaryBuffer};
pub use compositor::{PreviewCompositor, PreviewPixelBuffer};
pub use engine::{Address, BoundaryMemory, FontEngine, Operation};
pub use error::{ConverterError, Result};
#[cfg(feature = "native")]
pub use native::NativeEngine;
pub use pipeline::{EncodedFont, ImportReport, PipelineController, RenderRequest};
pub use result::{DualWordResult, PayloadOwnership, ResultDecoder};
pub use settings::ConverterSettings;
pub use source::{export_identifier, ExportedSource, FontSource};
pub use state::{Controls, PipelineStage, PipelineState};
