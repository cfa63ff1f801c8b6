//! CLI argument definitions using Clap v4

use clap::{Parser, Subcommand, ValueEnum};
use mcuf::error::Result;
use mcuf::settings::ConverterSettings;
use std::path::PathBuf;

/// MCUF - Convert TrueType fonts into bitmap fonts for microcontrollers
#[derive(Parser, Debug)]
#[command(name = "mcuf")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output (debug logging)
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// Silent mode (no progress info)
    #[arg(short = 'q', long = "quiet", global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert a TrueType font into C source
    #[command(alias = "c")]
    Convert(Box<ConvertArgs>),

    /// Display information about a font file
    #[command(alias = "i")]
    Info(InfoArgs),
}

/// Arguments for the convert command
#[derive(Parser, Debug)]
pub struct ConvertArgs {
    /// TrueType font file (.ttf)
    pub font: PathBuf,

    // Import Options
    /// Target font size in pixels
    #[arg(short = 's', long = "size")]
    pub size: Option<u32>,

    /// Monochrome (1-bit) rasterization
    #[arg(long = "mono", overrides_with = "no_mono")]
    pub mono: bool,

    /// Antialiased rasterization
    #[arg(long = "no-mono", overrides_with = "mono")]
    pub no_mono: bool,

    /// Run the size optimization pass
    #[arg(long = "optimize", overrides_with = "no_optimize")]
    pub optimize: bool,

    /// Skip the size optimization pass
    #[arg(long = "no-optimize", overrides_with = "optimize")]
    pub no_optimize: bool,

    /// Optimization iterations
    #[arg(short = 'n', long = "iterations")]
    pub iterations: Option<u32>,

    // Preview Options
    /// Preview text
    #[arg(short = 't', long = "text")]
    pub text: Option<String>,

    /// Preview canvas width in pixels
    #[arg(short = 'w', long = "width")]
    pub width: Option<u32>,

    /// Write the preview as PNG
    #[arg(long = "preview")]
    pub preview: Option<PathBuf>,

    // Output Options
    /// Directory for the generated .c file
    #[arg(short = 'o', long = "output-dir", default_value = ".")]
    pub output_dir: PathBuf,

    /// Settings file (JSON); command-line flags take precedence
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Conversion engine
    #[arg(long = "engine", default_value = "sim")]
    pub engine: EngineKind,

    /// Print a JSON summary instead of progress text
    #[arg(long = "json")]
    pub json: bool,
}

impl ConvertArgs {
    /// Settings from defaults, config file, `MCUF_*` environment, then flags
    pub fn settings(&self) -> Result<ConverterSettings> {
        let mut settings = match &self.config {
            Some(path) => ConverterSettings::from_json_file(path)?,
            None => ConverterSettings::default(),
        };
        settings.apply_env()?;

        if let Some(size) = self.size {
            settings.font_size = size;
        }
        if let Some(mono) = toggle(self.mono, self.no_mono) {
            settings.monochrome = mono;
        }
        if let Some(optimize) = toggle(self.optimize, self.no_optimize) {
            settings.optimize = optimize;
        }
        if let Some(iterations) = self.iterations {
            settings.iterations = iterations;
        }
        if let Some(text) = &self.text {
            settings.preview_text = text.clone();
        }
        if let Some(width) = self.width {
            settings.preview_width = width;
        }

        settings.validate()?;
        Ok(settings)
    }
}

fn toggle(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

/// Arguments for the info command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Font file to inspect
    pub font: PathBuf,

    /// Print JSON instead of text
    #[arg(long = "json")]
    pub json: bool,
}

/// Which engine performs the conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum EngineKind {
    /// Deterministic in-process simulation
    Sim,
    /// Linked mcufont_converter library (needs the `native` feature)
    Native,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::parse_from([
            "mcuf", "convert", "font.ttf", "-s", "20", "--no-mono", "--no-optimize", "-t", "Hi",
        ]);
        let Commands::Convert(args) = cli.command else {
            unreachable!("parsed convert");
        };
        let settings = args.settings().unwrap();

        assert_eq!(settings.font_size, 20);
        assert!(!settings.monochrome);
        assert!(!settings.optimize);
        assert_eq!(settings.preview_text, "Hi");
        assert_eq!(settings.preview_width, 300);
    }

    #[test]
    fn test_last_toggle_wins() {
        let cli = Cli::parse_from(["mcuf", "convert", "f.ttf", "--no-mono", "--mono"]);
        let Commands::Convert(args) = cli.command else {
            unreachable!("parsed convert");
        };
        assert!(args.mono);
        assert!(!args.no_mono);
    }

    #[test]
    fn test_invalid_width_rejected() {
        let cli = Cli::parse_from(["mcuf", "convert", "f.ttf", "-w", "1"]);
        let Commands::Convert(args) = cli.command else {
            unreachable!("parsed convert");
        };
        assert!(args.settings().is_err());
    }

    #[test]
    fn test_global_verbosity() {
        let cli = Cli::parse_from(["mcuf", "info", "f.ttf", "-v"]);
        assert!(cli.verbose);
        assert!(!cli.quiet);
    }
}
