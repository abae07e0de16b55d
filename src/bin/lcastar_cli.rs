use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use lcastar_rs::types::OrfSummary;
use lcastar_rs::{compute_contig_taxonomy, RunOptions};

/// Computes three estimates of contig taxonomy from per-ORF homology hits:
/// LCA^2, Majority, and the entropy-based LCA*.
#[derive(Parser, Debug)]
#[command(name = "lcastar-rs")]
#[command(version)]
struct Args {
    /// Parsed (B)LAST annotation table
    #[arg(short = 'i', long = "parsed_blast_file")]
    parsed_blast_file: PathBuf,

    /// Input mapping file (working id -> original id)
    #[arg(short = 'm', long = "mapping_file")]
    mapping_file: PathBuf,

    /// NCBI tree file (name, taxid, parent taxid)
    #[arg(long = "ncbi_tree")]
    ncbi_tree: Option<PathBuf>,

    /// Preferred names for NCBI taxids (map.ncbi)
    #[arg(long = "ncbi_megan_map")]
    ncbi_megan_map: Option<PathBuf>,

    /// Output file of predicted taxonomies [default: stdout]
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// How the hits of one ORF are summarised: lca, besthit or orf_majority
    #[arg(long = "orf_summary", default_value = "lca")]
    orf_summary: OrfSummary,

    /// Known taxonomy of each contig (contig, taxon)
    #[arg(long = "contig_taxa_ref")]
    contig_taxa_ref: Option<PathBuf>,

    /// Known taxonomy shared by every contig in the sample
    #[arg(long = "sample_taxa_ref")]
    sample_taxa_ref: Option<String>,

    /// Report all taxonomic estimation methods
    #[arg(long = "all_methods")]
    all_methods: bool,

    /// Also write one row per contig and method, with lineages, to this file
    #[arg(long = "long_output")]
    long_output: Option<PathBuf>,

    /// Worker threads for per-contig consensus
    #[arg(long = "threads", default_value_t = 1)]
    threads: usize,
}

fn spinner(color: &str, msg: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&[
                "⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏",
            ])
            .template(&format!("{{spinner:.{color}}} {{msg}}"))
            .expect("Invalid spinner template"),
    );
    spinner.set_message(msg);
    spinner
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads.max(1))
        .build_global()
        .context("Failed to configure the worker pool")?;

    let opts = RunOptions {
        parsed_blast: args.parsed_blast_file,
        mapping_file: args.mapping_file,
        ncbi_tree: args.ncbi_tree,
        ncbi_megan_map: args.ncbi_megan_map,
        contig_taxa_ref: args.contig_taxa_ref,
        sample_taxa_ref: args.sample_taxa_ref,
        orf_summary: args.orf_summary,
        all_methods: args.all_methods,
        long_report: args.long_output.is_some(),
    };

    // 1. Load inputs and compute consensus
    let progress = spinner("green", "Estimating contig taxonomy...");
    let results = compute_contig_taxonomy(&opts).context("Contig taxonomy estimation failed")?;
    progress.finish_with_message(format!("Estimated {} contig(s).", results.reports.len()));

    // 2. Write outputs
    let progress = spinner("yellow", "Writing output...");
    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Could not create {}", path.display()))?;
            results
                .write_report(&mut BufWriter::new(file))
                .with_context(|| format!("Could not write {}", path.display()))?;
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            results.write_report(&mut handle).context("Could not write to stdout")?;
            handle.flush()?;
        }
    }

    if let Some(path) = &args.long_output {
        fs::write(path, results.get_long_report())
            .with_context(|| format!("Could not write {}", path.display()))?;
    }
    progress.finish_with_message("Output written.");

    Ok(())
}
