use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use potree_extent::prelude::*;
use potree_extent::sink::DEFAULT_COMMIT_INTERVAL;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info, info_span, warn};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    /// PostGIS script: table, inserts, indexes.
    Sql,
    /// One JSON object per node.
    Ndjson,
}

/// Creates a table with the extent information of the files in a Potree octree.
/// The files are not opened, the information comes from the HRC files and the
/// known extent of the octree nodes.
#[derive(Parser, Debug)]
#[command(name = "potree-extent", version)]
struct Args {
    /// Input folder with the Potree octree
    #[arg(short, long)]
    input: PathBuf,

    /// SRID of the node footprints
    #[arg(short, long)]
    srid: i32,

    /// Table name
    #[arg(short = 't', long, default_value = "potree", value_parser = parse_table_name)]
    table: String,

    #[arg(long, value_enum, default_value_t = OutputFormat::Sql)]
    format: OutputFormat,

    /// Output file, stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Rows per transaction in the SQL script
    #[arg(long, default_value_t = DEFAULT_COMMIT_INTERVAL)]
    commit_interval: usize,

    /// Leave out the nodes owning a hierarchy file (r, r00000, ...)
    #[arg(long)]
    exclude_hierarchy_roots: bool,
}

fn parse_table_name(name: &str) -> Result<String, String> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if valid {
        Ok(name.to_string())
    } else {
        Err(format!("{name:?} is not a plain table identifier"))
    }
}

fn run(args: &Args) -> Result<()> {
    let metadata = CloudMetadata::from_dir(&args.input)
        .with_context(|| format!("reading metadata of {}", args.input.display()))?;
    let max_depth = metadata.max_depth();

    let layout = OctreeLayout::open(metadata.data_dir(&args.input), max_depth)?;
    info!(
        root = %layout.root_dir().display(),
        extension = %layout.extension(),
        step = metadata.hierarchy_step_size,
        "octree layout validated"
    );

    let out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    let out = BufWriter::new(out);

    let mut sink: Box<dyn RecordSink> = match args.format {
        OutputFormat::Sql => Box::new(
            SqlScriptSink::new(out, args.table.clone(), args.srid)
                .commit_interval(args.commit_interval)
                .with_layout(layout.clone()),
        ),
        OutputFormat::Ndjson => Box::new(NdjsonSink::new(out)),
    };

    let walker = TreeWalker::new(&layout, metadata.root_box(), max_depth)
        .include_hierarchy_roots(!args.exclude_hierarchy_roots);

    let count = walker.walk_into(sink.as_mut())?;
    sink.finish()?;

    if count == 0 {
        warn!(root = %layout.root_dir().display(), "no node found, is the root hierarchy file missing?");
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let _span = info_span!("potree-extent", input = %args.input.display()).entered();
    info!(
        srid = args.srid,
        table = %args.table,
        format = ?args.format,
        output = ?args.output,
        "starting"
    );

    let started = Instant::now();
    match run(&args) {
        Ok(()) => info!("Finished in {:.2} seconds", started.elapsed().as_secs_f64()),
        Err(err) => {
            error!("Execution failed: {err:#}");
            std::process::exit(1);
        }
    }
}
