//! Where the pipeline stands, and what a user may do next

use std::fmt;

/// The explicit pipeline stage
///
/// `Empty → Importing → Ready ⇄ Rendering`, with `Ready → Exporting → Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineStage {
    #[default]
    Empty,
    Importing,
    Ready,
    Rendering,
    Exporting,
}

impl PipelineStage {
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStage::Empty => "empty",
            PipelineStage::Importing => "importing",
            PipelineStage::Ready => "ready",
            PipelineStage::Rendering => "rendering",
            PipelineStage::Exporting => "exporting",
        }
    }

    /// Stages an import may start from
    pub fn accepts_import(self) -> bool {
        matches!(self, PipelineStage::Empty | PipelineStage::Ready)
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flag view of the pipeline, derived from the stage and held buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineState {
    pub has_source_font: bool,
    pub has_encoded_font: bool,
    pub is_processing: bool,
}

/// Which user controls are enabled right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Controls {
    /// Font picker and import options
    pub import: bool,
    /// Iteration count, only meaningful with optimization on
    pub iterations: bool,
    /// Live preview text input
    pub preview_text: bool,
    /// Download of the generated source
    pub download: bool,
}

impl Controls {
    /// Everything off, as while the engine is still loading
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn from_state(state: PipelineState, engine_ready: bool, optimize: bool) -> Self {
        if !engine_ready {
            return Self::disabled();
        }
        let idle = !state.is_processing;
        let has_font = state.has_encoded_font;
        Self {
            import: idle,
            iterations: idle && optimize,
            preview_text: idle && has_font,
            download: idle && has_font,
        }
    }
}
