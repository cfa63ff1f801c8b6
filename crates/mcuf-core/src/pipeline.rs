//! The controller that drives a font through Import → Optimize → Preview → Export

// this_file: crates/mcuf-core/src/pipeline.rs

use crate::{
    boundary::BoundaryAllocator,
    compositor::{PreviewCompositor, PreviewPixelBuffer},
    engine::{FontEngine, Operation},
    error::{ConverterError, Result},
    result::{PayloadOwnership, ResultDecoder},
    settings::ConverterSettings,
    source::{export_identifier, ExportedSource, FontSource},
    state::{Controls, PipelineStage, PipelineState},
};

/// The canonical bitmap-font encoding
///
/// Exactly one exists per controller. It is replaced as a whole when an
/// import (and its optional optimization) fully succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFont {
    bytes: Vec<u8>,
    generation: u64,
    font_size: u32,
    monochrome: bool,
    optimized: bool,
}

impl EncodedFont {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Bumped on every replacement
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn font_size(&self) -> u32 {
        self.font_size
    }

    pub fn monochrome(&self) -> bool {
        self.monochrome
    }

    pub fn optimized(&self) -> bool {
        self.optimized
    }
}

/// What a finished import produced
///
/// The encoding is committed once a report exists. The follow-up preview
/// render can still fail on its own, so it is carried as a `Result`.
#[derive(Debug)]
pub struct ImportReport {
    pub generation: u64,
    pub source_len: usize,
    pub encoded_len: usize,
    pub optimized: bool,
    /// Preview rendered against the new encoding
    pub preview: Result<PreviewPixelBuffer>,
}

/// Outcome of a preview-text change
#[derive(Debug, Clone)]
pub enum RenderRequest {
    Rendered(PreviewPixelBuffer),
    /// An import is in flight; the render runs once it finishes
    Deferred,
    /// Nothing to render yet
    NoFont,
}

/// Sequences engine calls and owns the canonical encoding
///
/// The engine is injected and held for the controller's lifetime, so every
/// boundary buffer the pipeline touches comes from one address space that
/// nothing else writes to. All transitions take `&mut self` and run to
/// completion.
///
/// ```ignore
/// use mcuf_core::{ConverterSettings, FontSource, PipelineController};
///
/// let mut pipeline = PipelineController::new(engine);
/// let report = pipeline.import(FontSource::from_path("font.ttf")?)?;
/// let code = pipeline.export()?;
/// code.write_to_dir(".")?;
/// ```
pub struct PipelineController<E: FontEngine> {
    engine: E,
    settings: ConverterSettings,
    compositor: PreviewCompositor,
    stage: PipelineStage,
    pending_source: Option<FontSource>,
    source_name: Option<String>,
    encoded: Option<EncodedFont>,
    generation: u64,
    pending_render: bool,
    preview: Option<PreviewPixelBuffer>,
}

impl<E: FontEngine> PipelineController<E> {
    /// Start empty with default settings
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            settings: ConverterSettings::default(),
            compositor: PreviewCompositor::new(),
            stage: PipelineStage::Empty,
            pending_source: None,
            source_name: None,
            encoded: None,
            generation: 0,
            pending_render: false,
            preview: None,
        }
    }

    /// Start empty with validated settings
    pub fn with_settings(engine: E, settings: ConverterSettings) -> Result<Self> {
        settings.validate()?;
        let mut controller = Self::new(engine);
        controller.settings = settings;
        Ok(controller)
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn settings(&self) -> &ConverterSettings {
        &self.settings
    }

    /// Replace the settings; they apply from the next transition on
    ///
    /// Rejected with [`ConverterError::Busy`] while an import is in flight,
    /// since that import reads its size and rasterization mode on completion.
    pub fn set_settings(&mut self, settings: ConverterSettings) -> Result<()> {
        self.ensure_idle(Operation::Import)?;
        settings.validate()?;
        self.settings = settings;
        Ok(())
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    pub fn state(&self) -> PipelineState {
        PipelineState {
            has_source_font: self.pending_source.is_some() || self.source_name.is_some(),
            has_encoded_font: self.encoded.is_some(),
            is_processing: self.is_processing(),
        }
    }

    pub fn is_processing(&self) -> bool {
        self.stage == PipelineStage::Importing
    }

    pub fn controls(&self) -> Controls {
        Controls::from_state(self.state(), self.engine.is_ready(), self.settings.optimize)
    }

    pub fn encoded(&self) -> Option<&EncodedFont> {
        self.encoded.as_ref()
    }

    /// Most recent successful preview
    pub fn preview(&self) -> Option<&PreviewPixelBuffer> {
        self.preview.as_ref()
    }

    pub fn source_name(&self) -> Option<&str> {
        self.source_name.as_deref()
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.engine.is_ready() {
            Ok(())
        } else {
            Err(ConverterError::EngineNotReady)
        }
    }

    fn ensure_idle(&self, operation: Operation) -> Result<()> {
        if self.is_processing() {
            log::warn!("Rejected {} while an import is in flight", operation);
            return Err(ConverterError::Busy { operation });
        }
        Ok(())
    }

    fn stable_stage(&self) -> PipelineStage {
        if self.encoded.is_some() {
            PipelineStage::Ready
        } else {
            PipelineStage::Empty
        }
    }

    /// Import, optionally optimize, then render the preview
    ///
    /// `Err` means the canonical encoding is unchanged. A preview failure
    /// after a committed import lands in [`ImportReport::preview`] instead.
    pub fn import(&mut self, source: FontSource) -> Result<ImportReport> {
        self.begin_import(source)?;
        self.finish_import()
    }

    /// Enter `Importing` with `source`; engine work happens in [`Self::finish_import`]
    pub fn begin_import(&mut self, source: FontSource) -> Result<()> {
        self.ensure_ready()?;
        self.ensure_idle(Operation::Import)?;
        if !self.stage.accepts_import() {
            return Err(ConverterError::Busy {
                operation: Operation::Import,
            });
        }
        self.settings.validate()?;

        log::info!("Importing {} ({} bytes)", source.name(), source.len());
        self.pending_source = Some(source);
        self.stage = PipelineStage::Importing;
        Ok(())
    }

    /// Run the engine import started by [`Self::begin_import`]
    ///
    /// The canonical encoding is only replaced once import and optimization
    /// both succeed. Preview renders deferred during the import collapse into
    /// the single render that follows.
    pub fn finish_import(&mut self) -> Result<ImportReport> {
        if let Err(e) = self.ensure_ready() {
            if self.stage == PipelineStage::Importing {
                if let Some(source) = self.pending_source.take() {
                    log::warn!("Dropped import of {}: {}", source.name(), e);
                }
                self.stage = self.stable_stage();
            }
            return Err(e);
        }
        let source = match (self.stage, self.pending_source.take()) {
            (PipelineStage::Importing, Some(source)) => source,
            (_, leftover) => {
                self.pending_source = leftover;
                return Err(ConverterError::InvalidParameter(
                    "no import in progress".into(),
                ));
            },
        };

        let outcome = self.run_import(&source);
        let (bytes, optimized) = match outcome {
            Ok(done) => done,
            Err(e) => {
                self.stage = self.stable_stage();
                log::warn!("Import of {} failed: {}", source.name(), e);
                if std::mem::take(&mut self.pending_render) && self.encoded.is_some() {
                    if let Err(render_err) = self.render_preview() {
                        log::warn!("Deferred preview render failed: {}", render_err);
                    }
                }
                return Err(e);
            },
        };

        self.generation += 1;
        let encoded = EncodedFont {
            bytes,
            generation: self.generation,
            font_size: self.settings.font_size,
            monochrome: self.settings.monochrome,
            optimized,
        };
        log::info!(
            "Imported {}: {} byte encoding, generation {}{}",
            source.name(),
            encoded.len(),
            encoded.generation,
            if optimized { ", optimized" } else { "" }
        );

        let encoded_len = encoded.len();
        self.encoded = Some(encoded);
        self.source_name = Some(source.name().to_string());
        self.stage = PipelineStage::Ready;
        self.pending_render = false;

        let preview = self.render_preview();
        if let Err(e) = &preview {
            log::warn!("Preview of {} failed after import: {}", source.name(), e);
        }
        Ok(ImportReport {
            generation: self.generation,
            source_len: source.len(),
            encoded_len,
            optimized,
            preview,
        })
    }

    fn run_import(&self, source: &FontSource) -> Result<(Vec<u8>, bool)> {
        let allocator = BoundaryAllocator::new(&self.engine);
        let decoder = ResultDecoder::new(allocator);

        let input = allocator.acquire(source.bytes())?;
        // SAFETY: `input` owns `input.len()` readable bytes for the whole call.
        let record = unsafe {
            self.engine.import_ttf(
                input.address(),
                input.len(),
                self.settings.font_size,
                self.settings.monochrome,
            )
        };
        // SAFETY: import returns a caller-owned record whose payload stays in
        // engine storage until the next import.
        let result =
            unsafe { decoder.decode(record, PayloadOwnership::EngineRetained, Operation::Import) }?;
        let encoded = result.into_bytes();
        input.release();

        if encoded.is_empty() {
            log::warn!("Engine produced an empty encoding");
            return Err(ConverterError::engine(Operation::Import));
        }

        if !self.settings.optimize {
            return Ok((encoded, false));
        }
        let optimized = self.run_optimize(&encoded)?;
        Ok((optimized, true))
    }

    fn run_optimize(&self, encoded: &[u8]) -> Result<Vec<u8>> {
        let allocator = BoundaryAllocator::new(&self.engine);
        let buffer = allocator.acquire(encoded)?;

        // Engines read a zero limit as "until converged", which may never end
        let iterations = self.settings.iterations.max(1);
        log::debug!("Optimizing {} bytes, {} iterations", buffer.len(), iterations);
        // SAFETY: `buffer` owns `buffer.len()` writable bytes for the whole call.
        unsafe {
            self.engine
                .optimize(buffer.address(), buffer.len(), iterations)
        };
        let optimized = buffer.read_view();
        buffer.release();
        Ok(optimized)
    }

    /// Render the current preview text against the canonical encoding
    pub fn render_preview(&mut self) -> Result<PreviewPixelBuffer> {
        self.ensure_ready()?;
        self.ensure_idle(Operation::Render)?;
        if self.encoded.is_none() {
            return Err(ConverterError::NoFontLoaded);
        }

        self.stage = PipelineStage::Rendering;
        let rendered = self.run_render();
        self.stage = PipelineStage::Ready;

        let preview = rendered?;
        self.preview = Some(preview.clone());
        Ok(preview)
    }

    fn run_render(&self) -> Result<PreviewPixelBuffer> {
        let encoded = self.encoded.as_ref().ok_or(ConverterError::NoFontLoaded)?;
        let allocator = BoundaryAllocator::new(&self.engine);
        let width = self.settings.preview_width;

        let text = allocator.acquire_c_string(&self.settings.preview_text)?;
        let font = allocator.acquire(encoded.bytes())?;
        // SAFETY: `font` and `text` stay alive across the call; `text` is NUL-terminated.
        let raw = unsafe {
            self.engine
                .render(font.address(), font.len(), width, text.address())
        };
        let height = self.engine.result_height();
        let len = (width as usize)
            .checked_mul(height as usize)
            .ok_or(ConverterError::SizeMismatch {
                expected: usize::MAX,
                actual: 0,
            })?;
        // SAFETY: render hands back a caller-owned image of `width * result_height()` bytes.
        let image = unsafe { allocator.adopt(raw, len, Operation::Render) }?;
        let grayscale = image.read_view();
        image.release();
        font.release();
        text.release();

        if height == 0 {
            log::warn!("Engine reported a zero preview height");
            return Err(ConverterError::engine(Operation::Render));
        }

        log::debug!(
            "Rendered {:?} at {}x{} (generation {})",
            self.settings.preview_text,
            width,
            height,
            encoded.generation
        );
        self.compositor.compose(&grayscale, width, height)
    }

    /// Change the preview text and re-render, or defer while importing
    pub fn set_preview_text(&mut self, text: impl Into<String>) -> Result<RenderRequest> {
        self.ensure_ready()?;
        let text = text.into();
        if text.contains('\0') {
            return Err(ConverterError::InvalidText(
                "preview text contains a NUL byte".into(),
            ));
        }
        self.settings.preview_text = text;

        if self.is_processing() {
            log::debug!("Deferring preview render until the import finishes");
            self.pending_render = true;
            return Ok(RenderRequest::Deferred);
        }
        if self.encoded.is_none() {
            return Ok(RenderRequest::NoFont);
        }
        self.render_preview().map(RenderRequest::Rendered)
    }

    /// Whether a preview render is waiting for the import to finish
    pub fn has_deferred_render(&self) -> bool {
        self.pending_render
    }

    /// Export C source named after the source file and imported size
    pub fn export(&mut self) -> Result<ExportedSource> {
        let encoded = self.encoded.as_ref().ok_or(ConverterError::NoFontLoaded)?;
        let name = self.source_name.as_deref().unwrap_or("font");
        let identifier = export_identifier(name, encoded.font_size);
        self.export_as(&identifier)
    }

    /// Export C source under an explicit identifier
    pub fn export_as(&mut self, identifier: &str) -> Result<ExportedSource> {
        self.ensure_ready()?;
        self.ensure_idle(Operation::Export)?;
        if self.encoded.is_none() {
            return Err(ConverterError::NoFontLoaded);
        }

        self.stage = PipelineStage::Exporting;
        let exported = self.run_export(identifier);
        self.stage = PipelineStage::Ready;

        let code = exported?;
        log::info!("Exported {} bytes as {}.c", code.len(), identifier);
        Ok(ExportedSource::new(identifier, code))
    }

    fn run_export(&self, identifier: &str) -> Result<Vec<u8>> {
        let encoded = self.encoded.as_ref().ok_or(ConverterError::NoFontLoaded)?;
        let allocator = BoundaryAllocator::new(&self.engine);
        let decoder = ResultDecoder::new(allocator);

        let font = allocator.acquire(encoded.bytes())?;
        let name = allocator.acquire_c_string(identifier)?;
        // SAFETY: `font` and `name` stay alive across the call; `name` is NUL-terminated.
        let record = unsafe {
            self.engine
                .export_to_c_code(font.address(), font.len(), name.address())
        };
        name.release();
        font.release();

        // SAFETY: export returns a caller-owned record pointing at a
        // separately allocated, caller-owned payload.
        let result =
            unsafe { decoder.decode(record, PayloadOwnership::CallerReleased, Operation::Export) }?;
        let code = result.into_bytes();

        if code.is_empty() {
            log::warn!("Engine produced empty source for {}", identifier);
            return Err(ConverterError::engine(Operation::Export));
        }
        Ok(code)
    }
}
