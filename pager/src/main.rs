use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process;

use clap::Parser;
use log::LevelFilter;

use pager::{PagerConfig, TraceReader, Translator};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Replay a memory access trace through a simulated TLB, page table and backing store"
)]
struct Args {
    /// Trace of decimal access entries (write flag at bit 16)
    #[arg(default_value = "addresses.txt")]
    trace: PathBuf,

    /// Backing store image, opened read-write
    #[arg(default_value = "BACKING_STORE.bin")]
    backing_store: PathBuf,

    /// JSON file with simulation geometry; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of physical frames
    #[arg(short, long)]
    frames: Option<usize>,

    /// TLB capacity
    #[arg(short, long)]
    tlb_entries: Option<usize>,

    /// Page size in bytes
    #[arg(long)]
    page_size: Option<usize>,

    /// Number of virtual pages
    #[arg(long)]
    pages: Option<usize>,

    /// Stop at the first malformed trace entry instead of failing
    #[arg(long)]
    lenient: bool,

    /// Only print the summary
    #[arg(short, long)]
    quiet: bool,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn pager_config(&self) -> Result<PagerConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
            None => PagerConfig::default(),
        };
        if let Some(frames) = self.frames {
            config.frames = frames;
        }
        if let Some(entries) = self.tlb_entries {
            config.tlb_entries = entries;
        }
        if let Some(size) = self.page_size {
            config.page_size = size;
        }
        if let Some(pages) = self.pages {
            config.virtual_pages = pages;
        }
        Ok(config)
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.pager_config()?;

    // Both handles are opened before anything is simulated
    let mut translator = Translator::open(config, &args.backing_store)?;
    let trace = TraceReader::open(&args.trace)?.lenient(args.lenient);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    let summary = translator.run(trace, |record| {
        if args.quiet {
            Ok(())
        } else {
            writeln!(out, "{}", record)
        }
    })?;

    if args.json {
        writeln!(out, "{}", summary.to_json()?)?;
    } else {
        writeln!(out, "{}", summary)?;
    }
    out.flush()?;
    Ok(())
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
