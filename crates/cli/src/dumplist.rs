//! dumplist - Print the commands of recorded display lists
//!
//! By default prints one summary line per command. With `--trace` the list is
//! replayed through a trace device instead, which logs every call with its
//! full arguments and clip/group nesting.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser};
use memmap2::Mmap;
use tracing_subscriber::EnvFilter;
use vellum_core::device::{Command, CommandKinds, DisplayList, TraceDevice};

#[derive(Parser, Debug)]
#[command(name = "dumplist")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Display list JSON files
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Replay through the trace device (logs to stderr)
    #[arg(long, action = ArgAction::SetTrue)]
    trace: bool,

    /// Comma-separated command kinds to keep, e.g. fill_text,clip_path
    #[arg(long)]
    only: Option<String>,
}

fn parse_only(spec: &str) -> Result<CommandKinds> {
    let mut kinds = CommandKinds::empty();
    for name in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match CommandKinds::parse_kind(name) {
            Some(kind) => kinds |= kind,
            None => bail!("unknown command kind {name:?}"),
        }
    }
    Ok(kinds)
}

fn summary(command: &Command) -> String {
    match command {
        Command::FillPath { path, ctm, .. } | Command::StrokePath { path, ctm, .. } => {
            format!("bounds={:?}", ctm.transform_rect(&path.bounds()))
        }
        Command::FillImage { image, .. } | Command::FillImageMask { image, .. } => {
            format!("{}x{}", image.width, image.height)
        }
        Command::FillText { text, .. } | Command::StrokeText { text, .. } => {
            format!("{:?}", text.text())
        }
        Command::BeginLayer { name } => format!("{name:?}"),
        _ => String::new(),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.trace { "trace" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(io::stderr)
        .init();

    let only = match &args.only {
        Some(spec) => parse_only(spec)?,
        None => CommandKinds::all(),
    };

    let mut output = BufWriter::new(io::stdout());
    for path in &args.files {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        // SAFETY: the file is only read, and not expected to change while mapped.
        let mmap =
            unsafe { Mmap::map(&file) }.with_context(|| format!("mapping {}", path.display()))?;
        let list = DisplayList::from_json(&mmap)
            .with_context(|| format!("parsing display list in {}", path.display()))?;

        writeln!(
            output,
            "page {} bounds={:?} commands={}",
            list.page_number,
            list.bounds,
            list.len()
        )?;

        if args.trace {
            let mut device = TraceDevice::with_interests(only);
            list.run(&mut device)
                .with_context(|| format!("replaying {}", path.display()))?;
            writeln!(output, "traced {} calls", device.calls())?;
            continue;
        }

        for (i, command) in list.iter().enumerate() {
            if !only.intersects(command.kind()) {
                continue;
            }
            writeln!(output, "{i:5} {:<18} {}", command.name(), summary(command))?;
        }
    }
    output.flush()?;
    Ok(())
}
