use std::fs::File;
use std::io::{stdout, Read};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use gerber::processor::Processor;

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Svg,
    Json,
}

/// Parse a Gerber (RS-274X) file and dump it as SVG or structured JSON.
#[derive(Parser)]
struct Cli {
    /// Gerber file to parse.
    filename: PathBuf,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Svg)]
    format: OutputFormat,

    /// Fill/stroke color for dark polarity geometry.
    #[arg(long, default_value = "white")]
    polarity_dark: String,

    /// Fill/stroke color (and SVG background) for clear polarity geometry.
    #[arg(long, default_value = "black")]
    polarity_clear: String,

    /// Emit a `data-pan-zoom` attribute on the root `<svg>` element.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pan_zoom: bool,

    /// Override the `<svg>` element's `width` attribute.
    #[arg(long)]
    width: Option<f64>,

    /// Override the `<svg>` element's `height` attribute.
    #[arg(long)]
    height: Option<f64>,

    /// Override the `<svg>` element's `data-scale` attribute.
    #[arg(long)]
    scale: Option<f64>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut file = File::open(&cli.filename)?;
    let mut src = String::new();
    file.read_to_string(&mut src)?;

    let mut processor: Processor = gerber::parse_str(&src)?;
    processor.polarity_dark = cli.polarity_dark;
    processor.polarity_clear = cli.polarity_clear;
    processor.pan_zoom = cli.pan_zoom;
    processor.width = cli.width;
    processor.height = cli.height;
    processor.scale = cli.scale;

    match cli.format {
        OutputFormat::Svg => gerber::svg::write(&processor, &mut stdout())?,
        OutputFormat::Json => println!("{}", processor.encode()?),
    }

    Ok(())
}
