//! MCUF - TrueType fonts into bitmap fonts for microcontrollers
//!
//! A font goes through four steps:
//! 1. Import at a target pixel size, monochrome or antialiased
//! 2. Optional size optimization
//! 3. Preview rendering of sample text
//! 4. Export as a named C source file
//!
//! The conversion itself is done by an engine behind a raw-memory boundary.
//! This crate wires an engine into the pipeline from [`mcuf_core`].
//!
//! # Example
//!
//! ```
//! use mcuf::prelude::*;
//!
//! let settings = ConverterSettings { optimize: false, ..Default::default() };
//! let source = FontSource::new("demo.ttf", vec![0, 1, 0, 0, 1, 2, 3]);
//! let conversion = mcuf::convert(SimEngine::new(), source, settings)?;
//!
//! assert_eq!(conversion.exported.file_name(), "demo14bw.c");
//! # Ok::<(), ConverterError>(())
//! ```
//!
//! # Feature Flags
//!
//! - `sim` (default): the simulated engine, [`SimEngine`]
//! - `native`: `NativeEngine`, linked against `mcufont_converter`

pub use mcuf_core::{
    boundary, compositor, engine, error, pipeline, result, settings, source, state,
};

#[cfg(feature = "native")]
pub use mcuf_core::NativeEngine;
#[cfg(feature = "sim")]
pub use mcuf_engine_sim::{SimEngine, SimStats};

use mcuf_core::{
    ConverterSettings, ExportedSource, FontEngine, FontSource, ImportReport, PipelineController,
    Result,
};

/// Everything one run through the pipeline produced
#[derive(Debug)]
pub struct Conversion {
    pub report: ImportReport,
    pub exported: ExportedSource,
}

/// Import, optimize, preview and export `source` in one go
pub fn convert<E: FontEngine>(
    engine: E,
    source: FontSource,
    settings: ConverterSettings,
) -> Result<Conversion> {
    let mut pipeline = PipelineController::with_settings(engine, settings)?;
    let report = pipeline.import(source)?;
    let exported = pipeline.export()?;
    log::info!(
        "Converted into {} ({} bytes)",
        exported.file_name(),
        exported.bytes().len()
    );
    Ok(Conversion { report, exported })
}

/// Common imports for typical usage
pub mod prelude {
    pub use mcuf_core::{
        Controls, ConverterError, ConverterSettings, ExportedSource, FontEngine, FontSource,
        ImportReport, PipelineController, PipelineStage, PreviewPixelBuffer, RenderRequest,
        Result,
    };

    #[cfg(feature = "sim")]
    pub use mcuf_engine_sim::SimEngine;
}
