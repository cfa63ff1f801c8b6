//! Conversion settings
//!
//! Defaults match the converter's form: 14 px, monochrome, optimization on
//! with 50 iterations, preview text `Abc1230` on a 300 px wide canvas.
//!
//! Settings load from a JSON file and can be overridden per process through
//! environment variables:
//!
//! ```bash
//! MCUF_FONT_SIZE=16 MCUF_OPTIMIZE=0 mcuf convert font.ttf
//! ```
//!
//! | Variable | Field |
//! |---|---|
//! | `MCUF_FONT_SIZE` | `font_size` |
//! | `MCUF_MONOCHROME` | `monochrome` |
//! | `MCUF_OPTIMIZE` | `optimize` |
//! | `MCUF_ITERATIONS` | `iterations` |
//! | `MCUF_PREVIEW_TEXT` | `preview_text` |
//! | `MCUF_PREVIEW_WIDTH` | `preview_width` |

use crate::error::{ConverterError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything the pipeline needs to know besides the font itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterSettings {
    /// Target pixel size of the bitmap font
    pub font_size: u32,
    /// Use the engine's 1-bit rasterization path
    pub monochrome: bool,
    /// Run the size optimization pass after import
    pub optimize: bool,
    /// Optimization iterations; 0 runs a single pass, since the linked
    /// engine would otherwise loop without a limit
    pub iterations: u32,
    /// Text rendered into the preview
    pub preview_text: String,
    /// Preview canvas width in pixels
    pub preview_width: u32,
}

impl Default for ConverterSettings {
    fn default() -> Self {
        Self {
            font_size: 14,
            monochrome: true,
            optimize: true,
            iterations: 50,
            preview_text: "Abc1230".to_string(),
            preview_width: 300,
        }
    }
}

impl ConverterSettings {
    /// Read settings from a JSON file; missing fields keep their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&text)
            .map_err(|e| ConverterError::Config(format!("{}: {e}", path.display())))?;
        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Apply `MCUF_*` overrides from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup, so tests need not touch the process env
    pub fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(val) = lookup("MCUF_FONT_SIZE") {
            self.font_size = parse_number("MCUF_FONT_SIZE", &val)?;
            log::info!("Font size {} via MCUF_FONT_SIZE", self.font_size);
        }
        if let Some(val) = lookup("MCUF_MONOCHROME") {
            self.monochrome = parse_flag("MCUF_MONOCHROME", &val)?;
            log::info!("Monochrome {} via MCUF_MONOCHROME", self.monochrome);
        }
        if let Some(val) = lookup("MCUF_OPTIMIZE") {
            self.optimize = parse_flag("MCUF_OPTIMIZE", &val)?;
            log::info!("Optimization {} via MCUF_OPTIMIZE", self.optimize);
        }
        if let Some(val) = lookup("MCUF_ITERATIONS") {
            self.iterations = parse_number("MCUF_ITERATIONS", &val)?;
            log::info!("Iterations {} via MCUF_ITERATIONS", self.iterations);
        }
        if let Some(val) = lookup("MCUF_PREVIEW_TEXT") {
            log::info!("Preview text {:?} via MCUF_PREVIEW_TEXT", val);
            self.preview_text = val;
        }
        if let Some(val) = lookup("MCUF_PREVIEW_WIDTH") {
            self.preview_width = parse_number("MCUF_PREVIEW_WIDTH", &val)?;
            log::info!("Preview width {} via MCUF_PREVIEW_WIDTH", self.preview_width);
        }
        Ok(())
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.font_size == 0 {
            return Err(ConverterError::InvalidParameter(
                "font size must be greater than zero".into(),
            ));
        }
        // The engine wraps text inside width - 2
        if self.preview_width <= 2 {
            return Err(ConverterError::InvalidParameter(format!(
                "preview width must exceed 2 pixels, got {}",
                self.preview_width
            )));
        }
        if self.preview_text.contains('\0') {
            return Err(ConverterError::InvalidText(
                "preview text contains a NUL byte".into(),
            ));
        }
        Ok(())
    }
}

fn parse_flag(key: &str, val: &str) -> Result<bool> {
    match val.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConverterError::Config(format!("{key}: not a flag: {other:?}"))),
    }
}

fn parse_number(key: &str, val: &str) -> Result<u32> {
    val.trim()
        .parse()
        .map_err(|_| ConverterError::Config(format!("{key}: not a number: {val:?}")))
}
