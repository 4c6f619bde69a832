use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tilescope::features::{FeatureFilter, FeatureSet};
use tilescope::genomics::{
    CompositionConfig, DensityConfig, DensityPolicy, GenomicRange, PackedGenomeStore,
    StoreOptions,
};
use tilescope::plugin::{
    AnnotationSource, CompositionSource, DensitySource, EntryPoint, SequenceSource,
};
use tilescope::store::BamAlignmentStore;
use tilescope::tiling::TilingConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tilescope", about = "Zoom-dependent annotation tiles over BAM and 2bit files")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Read mappings and per-tile depth from an indexed BAM file.
    Density {
        /// Indexed BAM file.
        bam: PathBuf,
        #[command(flatten)]
        query: QueryArgs,
        /// BAM index (default: `<bam>.bai`).
        #[arg(long)]
        index: Option<PathBuf>,
        /// Drop records with mapping quality below this (-1 keeps all).
        #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
        min_mapq: i32,
        /// Attach read names as pair keys on mapping features.
        #[arg(long)]
        group_pairs: bool,
        /// Depth weighting.
        #[arg(long, value_enum, default_value_t = PolicyArg::Fragment)]
        policy: PolicyArg,
        /// Smallest tile size in bases.
        #[arg(long, default_value_t = 100)]
        min_tile: u32,
        /// Print only density tiles.
        #[arg(long)]
        tiles_only: bool,
    },
    /// GC fraction and CpG observed/expected tiles from a 2bit genome.
    Composition {
        /// 2bit genome.
        genome: PathBuf,
        #[command(flatten)]
        query: QueryArgs,
        /// Smallest tile size in bases.
        #[arg(long, default_value_t = 10)]
        min_tile: u32,
        /// Minimum measurement window in bases.
        #[arg(long, default_value_t = 500)]
        min_window: u32,
    },
    /// Repeat-masked blocks from a 2bit genome.
    Repeats {
        /// 2bit genome.
        genome: PathBuf,
        #[command(flatten)]
        query: QueryArgs,
    },
    /// Print bases of a region of a 2bit genome.
    Bases {
        /// 2bit genome.
        genome: PathBuf,
        /// Sequence name (`chr` prefix optional).
        reference: String,
        /// First base (1-based).
        start: u32,
        /// Last base (inclusive).
        end: u32,
    },
    /// List the references a source serves.
    EntryPoints {
        /// BAM or 2bit file.
        path: PathBuf,
        /// Which source to list for.
        #[arg(long, value_enum, default_value_t = SourceArg::Sequence)]
        source: SourceArg,
    },
}

#[derive(clap::Args, Debug)]
struct QueryArgs {
    /// Reference name (`chr` prefix optional).
    reference: String,
    /// First base of the query (1-based); omit for the whole reference.
    #[arg(long, requires = "end")]
    start: Option<u32>,
    /// Last base of the query (inclusive).
    #[arg(long, requires = "start")]
    end: Option<u32>,
    /// Maximum number of display bins (<= 0 selects the default).
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    max_bins: i32,
}

impl QueryArgs {
    fn filter(&self) -> Result<FeatureFilter> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => {
                let range = GenomicRange::new(start, end)
                    .with_context(|| format!("invalid query range {start}..{end}"))?;
                Ok(FeatureFilter::Overlaps(range))
            }
            _ => Ok(FeatureFilter::All),
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PolicyArg {
    /// One normalized contribution per fragment.
    Fragment,
    /// Raw per-base coverage of every record.
    Raw,
}

impl From<PolicyArg> for DensityPolicy {
    fn from(value: PolicyArg) -> Self {
        match value {
            PolicyArg::Fragment => DensityPolicy::FragmentDepth,
            PolicyArg::Raw => DensityPolicy::RawCoverage,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SourceArg {
    /// Indexed BAM file.
    Bam,
    /// 2bit genome as served for composition.
    Composition,
    /// 2bit genome as served for sequence and repeats.
    Sequence,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Density {
            bam,
            query,
            index,
            min_mapq,
            group_pairs,
            policy,
            min_tile,
            tiles_only,
        } => {
            let store = BamAlignmentStore::open(&bam, index.as_deref())
                .with_context(|| format!("failed to open BAM {}", bam.display()))?;
            let config = DensityConfig::default()
                .with_tiling(TilingConfig::default().with_min_tile(min_tile))
                .with_quality_threshold(min_mapq)
                .with_group_pairs(group_pairs)
                .with_policy(policy.into());
            let source = DensitySource::new(store, config).context("invalid density settings")?;
            let mut filter = query.filter()?;
            if tiles_only {
                filter = filter.and(FeatureFilter::ByType(tilescope::FeatureType::Density));
            }
            run_query(&source, &query, &filter)?
        }
        Commands::Composition {
            genome,
            query,
            min_tile,
            min_window,
        } => {
            let config = CompositionConfig::default()
                .with_tiling(TilingConfig::default().with_min_tile(min_tile))
                .with_min_window(min_window);
            let source = CompositionSource::open(&genome, config)
                .with_context(|| format!("failed to open 2bit genome {}", genome.display()))?;
            run_query(&source, &query, &query.filter()?)?
        }
        Commands::Repeats { genome, query } => {
            let source = SequenceSource::open(&genome)
                .with_context(|| format!("failed to open 2bit genome {}", genome.display()))?;
            run_query(&source, &query, &query.filter()?)?
        }
        Commands::Bases {
            genome,
            reference,
            start,
            end,
        } => run_bases(genome, &reference, start, end)?,
        Commands::EntryPoints { path, source } => run_entry_points(path, source)?,
    }

    Ok(())
}

fn run_query(source: &dyn AnnotationSource, query: &QueryArgs, filter: &FeatureFilter) -> Result<()> {
    let features = source
        .features(&query.reference, filter, query.max_bins)
        .with_context(|| format!("query on {} failed", query.reference))?;
    print_features(&query.reference, &features)
}

fn run_bases(genome: PathBuf, reference: &str, start: u32, end: u32) -> Result<()> {
    let source = SequenceSource::open(&genome)
        .with_context(|| format!("failed to open 2bit genome {}", genome.display()))?;
    let range = GenomicRange::new(start, end)
        .with_context(|| format!("invalid range {start}..{end}"))?;
    let bases = source
        .bases(reference, &range)
        .with_context(|| format!("failed to read {reference}:{range}"))?;

    let mut out = BufWriter::new(io::stdout().lock());
    writeln!(out, ">{reference}:{range}")?;
    for line in bases.chunks(60) {
        out.write_all(line)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

fn run_entry_points(path: PathBuf, source: SourceArg) -> Result<()> {
    let points: Vec<EntryPoint> = match source {
        SourceArg::Bam => {
            let store = BamAlignmentStore::open(&path, None)
                .with_context(|| format!("failed to open BAM {}", path.display()))?;
            DensitySource::new(store, DensityConfig::default())?.entry_points()?
        }
        SourceArg::Composition => {
            let store = PackedGenomeStore::open(&path, StoreOptions::default().with_elide_repeats(true))
                .with_context(|| format!("failed to open 2bit genome {}", path.display()))?;
            CompositionSource::from_store(store, CompositionConfig::default())?.entry_points()?
        }
        SourceArg::Sequence => SequenceSource::open(&path)
            .with_context(|| format!("failed to open 2bit genome {}", path.display()))?
            .entry_points()?,
    };

    let mut out = BufWriter::new(io::stdout().lock());
    for point in points {
        match point.length {
            Some(length) => writeln!(out, "{}\t{}", point.name, length)?,
            None => writeln!(out, "{}\t.", point.name)?,
        }
    }
    out.flush()?;
    Ok(())
}

fn print_features(reference: &str, features: &FeatureSet) -> Result<()> {
    let mut out = BufWriter::new(io::stdout().lock());
    for feature in features {
        writeln!(out, "{reference}\t{feature}")?;
    }
    out.flush()?;
    Ok(())
}
