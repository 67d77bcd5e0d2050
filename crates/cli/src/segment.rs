//! segment - Segment recorded pages into text blocks
//!
//! Reads JSON display lists (or JSON glyph runs with `--letters`), runs the
//! content pipeline on every page in parallel and prints the blocks as text
//! or JSON. Optionally rasterizes each page to PNG.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, ValueEnum};
use memmap2::Mmap;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use vellum_core::device::{ContentOptions, DisplayList, SegmenterKind};
use vellum_core::geometry::Rect;
use vellum_core::model::{FontCache, Rgba};
use vellum_core::page::{GlyphRun, Page, RenderOptions, extract_pages};

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputType {
    /// Block text, blank line between blocks
    #[default]
    Text,
    /// Blocks with lines, words and quads
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "segment")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// One page per file
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Use debug logging level
    #[arg(short = 'd', long, action = ArgAction::SetTrue)]
    debug: bool,

    /// Inputs are JSON arrays of glyph runs instead of display lists
    #[arg(long, action = ArgAction::SetTrue)]
    letters: bool,

    /// Page size for --letters input, as WIDTHxHEIGHT
    #[arg(long = "page-size", default_value = "612x792")]
    page_size: String,

    /// Use the basic segmenter instead of Docstrum
    #[arg(long, action = ArgAction::SetTrue)]
    basic: bool,

    /// JSON file with content options
    #[arg(long)]
    options: Option<PathBuf>,

    /// Path to file where output is written, or "-" for stdout
    #[arg(short = 'o', long, default_value = "-")]
    outfile: String,

    /// Type of output to generate
    #[arg(short = 't', long = "output-type", value_enum, default_value = "text")]
    output_type: OutputType,

    /// Render pages to PNG; pages after the first get a -N suffix
    #[arg(long)]
    png: Option<PathBuf>,

    /// Pixels per page unit for --png
    #[arg(short = 's', long, default_value = "1.0")]
    scale: f64,
}

fn parse_page_size(s: &str) -> Result<Rect> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .with_context(|| format!("page size {s:?} is not WIDTHxHEIGHT"))?;
    let w: f64 = w.trim().parse().with_context(|| format!("bad page width {w:?}"))?;
    let h: f64 = h.trim().parse().with_context(|| format!("bad page height {h:?}"))?;
    if w <= 0.0 || h <= 0.0 {
        bail!("page size must be positive, got {s}");
    }
    Ok(Rect::from_xywh(0.0, 0.0, w, h))
}

fn load_options(args: &Args) -> Result<ContentOptions> {
    let mut options = match &args.options {
        Some(path) => {
            let data = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_slice(&data).with_context(|| format!("parsing {}", path.display()))?
        }
        None => ContentOptions::default(),
    };
    if args.basic {
        options.segmenter = SegmenterKind::Basic;
    }
    Ok(options)
}

fn load_page(path: &Path, number: usize, args: &Args, fonts: &FontCache) -> Result<Page> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    // SAFETY: the file is only read, and not expected to change while mapped.
    let mmap = unsafe { Mmap::map(&file) }.with_context(|| format!("mapping {}", path.display()))?;

    if args.letters {
        let runs: Vec<GlyphRun> = serde_json::from_slice(&mmap)
            .with_context(|| format!("parsing glyph runs in {}", path.display()))?;
        let bounds = parse_page_size(&args.page_size)?;
        return Ok(Page::from_runs(number, bounds, &runs, fonts));
    }

    let list = DisplayList::from_json(&mmap)
        .with_context(|| format!("parsing display list in {}", path.display()))?;
    Ok(Page::from(list))
}

fn png_path(base: &Path, index: usize) -> PathBuf {
    if index == 0 {
        return base.to_path_buf();
    }
    let stem = base.file_stem().and_then(|s| s.to_str()).unwrap_or("page");
    let ext = base.extension().and_then(|s| s.to_str()).unwrap_or("png");
    base.with_file_name(format!("{stem}-{}.{ext}", index + 1))
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(io::stderr)
        .init();

    let options = load_options(&args)?;
    let fonts = FontCache::new();
    let pages = args
        .files
        .iter()
        .enumerate()
        .map(|(i, path)| load_page(path, i + 1, &args, &fonts))
        .collect::<Result<Vec<_>>>()?;
    debug!(pages = pages.len(), fonts = fonts.len(), "loaded input");

    let contents = extract_pages(&pages, &options, None).context("segmenting pages")?;

    let mut output: Box<dyn Write> = if args.outfile == "-" {
        Box::new(BufWriter::new(io::stdout()))
    } else {
        let file = File::create(&args.outfile)
            .with_context(|| format!("creating output file {}", args.outfile))?;
        Box::new(BufWriter::new(file))
    };

    match args.output_type {
        OutputType::Text => {
            for content in &contents {
                writeln!(output, "{}", content.text())?;
                writeln!(output, "\x0c")?;
            }
        }
        OutputType::Json => {
            let blocks: Vec<_> = contents.iter().map(|c| &c.blocks).collect();
            serde_json::to_writer_pretty(&mut output, &blocks)?;
            writeln!(output)?;
        }
    }
    output.flush()?;

    if let Some(base) = &args.png {
        let render = RenderOptions {
            scale: args.scale,
            background: Rgba::WHITE,
        };
        for (i, page) in pages.iter().enumerate() {
            let path = png_path(base, i);
            let png = page
                .render(&render)
                .and_then(|device| device.encode_png())
                .with_context(|| format!("rendering page {}", page.number))?;
            fs::write(&path, png).with_context(|| format!("writing {}", path.display()))?;
            info!(page = page.number, path = %path.display(), "wrote png");
        }
    }

    Ok(())
}
