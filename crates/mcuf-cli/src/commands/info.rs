//! Info command implementation
//!
//! Reports what the converter needs to know about a font file.

use crate::cli::InfoArgs;
use mcuf::error::{ConverterError, Result};
use read_fonts::{types::Tag, FontRef, TableProvider};
use serde::Serialize;
use skrifa::{string::StringId, MetadataProvider};

/// Facts about a font file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FontFacts {
    pub family: Option<String>,
    pub glyph_count: u16,
    pub units_per_em: u16,
    /// Has TrueType outlines, the only kind the converter accepts
    pub truetype: bool,
}

/// Parse `data` as a font and collect its [`FontFacts`]
pub fn inspect(data: &[u8]) -> Result<FontFacts> {
    let font = FontRef::new(data)
        .map_err(|e| ConverterError::InvalidParameter(format!("Not a font file: {e}")))?;

    let family = font
        .localized_strings(StringId::FAMILY_NAME)
        .english_or_first()
        .map(|name| name.chars().collect::<String>());
    let glyph_count = font.maxp().map(|maxp| maxp.num_glyphs()).unwrap_or(0);
    let units_per_em = font.head().map(|head| head.units_per_em()).unwrap_or(0);
    let truetype = font.table_data(Tag::new(b"glyf")).is_some();

    Ok(FontFacts {
        family,
        glyph_count,
        units_per_em,
        truetype,
    })
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let data = std::fs::read(&args.font)?;
    let facts = inspect(&data)?;
    log::debug!("Inspected {}: {:?}", args.font.display(), facts);

    if args.json {
        let json = serde_json::to_string_pretty(&facts)
            .map_err(|e| ConverterError::InvalidParameter(e.to_string()))?;
        println!("{json}");
        return Ok(());
    }

    println!("Font: {}", args.font.display());
    println!("  Family: {}", facts.family.as_deref().unwrap_or("(unnamed)"));
    println!("  Glyphs: {}", facts.glyph_count);
    println!("  Units per em: {}", facts.units_per_em);
    println!(
        "  TrueType outlines: {}",
        if facts.truetype {
            "yes"
        } else {
            "no (not supported)"
        }
    );
    Ok(())
}
