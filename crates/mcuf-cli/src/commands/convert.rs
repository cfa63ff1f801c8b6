//! Convert command implementation
//!
//! Font file in, `<stem><size>bw.c` out, with an optional PNG preview.

use std::path::{Path, PathBuf};

use image::{ImageEncoder, RgbaImage};
use mcuf::compositor::PreviewPixelBuffer;
use mcuf::engine::FontEngine;
use mcuf::error::{ConverterError, Result};
use mcuf::pipeline::PipelineController;
use mcuf::settings::ConverterSettings;
use mcuf::source::FontSource;
use mcuf::SimEngine;
use serde::Serialize;

use super::info::inspect;
use crate::cli::{ConvertArgs, EngineKind};

/// What a conversion wrote, for `--json`
#[derive(Debug, Serialize)]
pub struct ConvertSummary {
    pub source: String,
    pub source_bytes: usize,
    pub encoded_bytes: usize,
    pub optimized: bool,
    pub generation: u64,
    pub output: PathBuf,
    pub code_bytes: usize,
    pub preview_width: u32,
    pub preview_height: u32,
    pub preview: Option<PathBuf>,
}

pub fn run(args: &ConvertArgs, quiet: bool) -> Result<()> {
    let settings = args.settings()?;
    let source = FontSource::from_path(&args.font)?;

    let facts = inspect(source.bytes())?;
    if !facts.truetype {
        return Err(ConverterError::InvalidParameter(format!(
            "{} has no TrueType outlines; only TTF fonts are supported",
            args.font.display()
        )));
    }

    let summary = match args.engine {
        EngineKind::Sim => convert_with(SimEngine::new(), source, settings, args)?,
        #[cfg(feature = "native")]
        EngineKind::Native => convert_with(mcuf::NativeEngine::new(), source, settings, args)?,
        #[cfg(not(feature = "native"))]
        EngineKind::Native => {
            return Err(ConverterError::InvalidParameter(
                "this build has no native engine; rebuild with --features native".into(),
            ))
        },
    };

    if args.json {
        let json = serde_json::to_string_pretty(&summary)
            .map_err(|e| ConverterError::InvalidParameter(e.to_string()))?;
        println!("{json}");
    } else if !quiet {
        eprintln!("✓ Converted {} to {}", summary.source, summary.output.display());
        eprintln!(
            "  Encoding: {} bytes{}",
            summary.encoded_bytes,
            if summary.optimized { " (optimized)" } else { "" }
        );
        eprintln!("  Source: {} bytes", summary.code_bytes);
        if let Some(preview) = &summary.preview {
            eprintln!(
                "  Preview: {}x{} pixels in {}",
                summary.preview_width,
                summary.preview_height,
                preview.display()
            );
        }
    }
    Ok(())
}

fn convert_with<E: FontEngine>(
    engine: E,
    source: FontSource,
    settings: ConverterSettings,
    args: &ConvertArgs,
) -> Result<ConvertSummary> {
    let name = source.name().to_string();
    let source_bytes = source.len();

    let mut pipeline = PipelineController::with_settings(engine, settings)?;
    let report = pipeline.import(source)?;
    let exported = pipeline.export()?;

    std::fs::create_dir_all(&args.output_dir)?;
    let output = exported.write_to_dir(&args.output_dir)?;

    let image = report.preview?;
    let preview = match &args.preview {
        Some(path) => {
            write_png(&image, path)?;
            Some(path.clone())
        },
        None => None,
    };

    Ok(ConvertSummary {
        source: name,
        source_bytes,
        encoded_bytes: report.encoded_len,
        optimized: report.optimized,
        generation: report.generation,
        output,
        code_bytes: exported.bytes().len(),
        preview_width: image.width(),
        preview_height: image.height(),
        preview,
    })
}

/// Encode the RGBA preview as PNG
pub fn encode_png(preview: &PreviewPixelBuffer) -> Result<Vec<u8>> {
    let img: RgbaImage =
        RgbaImage::from_raw(preview.width(), preview.height(), preview.data().to_vec()).ok_or(
            ConverterError::SizeMismatch {
                expected: preview.width() as usize * preview.height() as usize * 4,
                actual: preview.data().len(),
            },
        )?;

    let mut png_data = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new_with_quality(
        &mut png_data,
        image::codecs::png::CompressionType::Default,
        image::codecs::png::FilterType::Sub,
    );
    encoder
        .write_image(
            img.as_raw(),
            preview.width(),
            preview.height(),
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|e| std::io::Error::other(format!("PNG encoding failed: {e}")))?;

    Ok(png_data)
}

fn write_png(preview: &PreviewPixelBuffer, path: &Path) -> Result<()> {
    let png = encode_png(preview)?;
    std::fs::write(path, &png)?;
    log::info!("Wrote {} byte preview to {}", png.len(), path.display());
    Ok(())
}
