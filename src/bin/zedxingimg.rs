//! Command line scanner: decode barcodes from image files.

use clap::Parser;
use zedxing::{
    read_barcodes, set_verbosity, Binarizer, EanAddOnSymbol, FormatSet, ImageFormat, ImageView,
    ReaderOptions, TextMode,
};

#[derive(Parser)]
#[command(name = "zedxingimg", about = "Decode barcodes from image files")]
struct Args {
    /// Image files to scan
    #[arg(required = true)]
    files: Vec<String>,

    /// Comma separated list of formats to look for (default: all)
    #[arg(short, long)]
    formats: Option<String>,

    /// Spend more time searching for symbols
    #[arg(long, default_value_t = true)]
    try_harder: bool,

    /// Assume a single clean, axis-aligned symbol
    #[arg(long)]
    pure: bool,

    /// Include failed decodes in the output
    #[arg(long)]
    errors: bool,

    /// Binarizer: local, global, fixed
    #[arg(long, default_value = "local")]
    binarizer: String,

    /// Render GS1 data human readable
    #[arg(long)]
    hri: bool,

    /// Require EAN/UPC add-on symbols
    #[arg(long)]
    require_addon: bool,

    /// Print positions and diagnostics
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    set_verbosity(i32::from(args.verbose));

    let mut opts = ReaderOptions::new()
        .try_harder(args.try_harder)
        .is_pure(args.pure)
        .return_errors(args.errors)
        .binarizer(match args.binarizer.as_str() {
            "global" => Binarizer::GlobalHistogram,
            "fixed" => Binarizer::FixedThreshold,
            _ => Binarizer::LocalAverage,
        });
    if args.hri {
        opts = opts.text_mode(TextMode::Hri);
    }
    if args.require_addon {
        opts = opts.ean_addon(EanAddOnSymbol::Require);
    } else {
        opts = opts.ean_addon(EanAddOnSymbol::Read);
    }
    if let Some(formats) = &args.formats {
        opts = opts.format_set(FormatSet::parse(formats)?);
    }

    let mut exit_code = 0;
    for file in &args.files {
        let img = image::open(file)?.to_luma8();
        let (width, height) = img.dimensions();
        let view = ImageView::new(
            img.as_raw(),
            width as usize,
            height as usize,
            ImageFormat::Lum,
        )?;
        let results = read_barcodes(&view, &opts)?;
        if results.is_empty() {
            eprintln!("{file}: no barcode found");
            exit_code = 1;
            continue;
        }
        for barcode in results {
            if args.verbose > 0 {
                let p = barcode.position();
                println!(
                    "{file}: {} {} {} @ ({},{})-({},{}) lines={} rot={}",
                    barcode.format(),
                    barcode.symbology_identifier(),
                    barcode.text(),
                    p.top_left.x,
                    p.top_left.y,
                    p.bottom_right.x,
                    p.bottom_right.y,
                    barcode.line_count(),
                    barcode.orientation(),
                );
            } else {
                println!("{file}: {} {}", barcode.format(), barcode.text());
            }
            if barcode.error().is_error() {
                eprintln!("{file}: partial decode: {}", barcode.error());
            }
        }
    }
    std::process::exit(exit_code);
}
