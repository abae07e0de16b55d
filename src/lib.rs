// src/lib.rs
pub mod consensus;
pub mod error;
pub mod hits;
pub mod lcastar;
pub mod report;
pub mod resolver;
pub mod tables;
pub mod taxdb;
pub mod types;

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use crate::consensus::estimate_contigs;
use crate::error::Result;
use crate::hits::read_hit_table;
use crate::report::{render_long_report, render_report, write_report, ReportLayout};
use crate::tables::{
    load_contig_references, load_mapping_table, load_name_preferences, MappingTable,
    NamePreferences,
};
use crate::taxdb::{load_ncbi_tree, LcaStarParams, NcbiTree};
use crate::types::{ContigReport, OrfSummary, PipelineConfig, ReferenceTaxon};

/// Input locations and switches for one run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub parsed_blast: PathBuf,
    pub mapping_file: PathBuf,
    pub ncbi_tree: Option<PathBuf>,
    pub ncbi_megan_map: Option<PathBuf>,
    pub contig_taxa_ref: Option<PathBuf>,
    pub sample_taxa_ref: Option<String>,
    pub orf_summary: OrfSummary,
    pub all_methods: bool,
    /// Also compute what the long-format report needs (all three estimators)
    pub long_report: bool,
}

/// Per-contig results plus the lookups needed to render them.
pub struct ContigTaxonomyResults {
    /// One entry per contig, in hit-table order
    pub reports: Vec<ContigReport>,
    pub layout: ReportLayout,
    pub mapping: Arc<MappingTable>,
    pub name_preferences: Arc<NamePreferences>,
    pub tree: Arc<NcbiTree>,
}

impl ContigTaxonomyResults {
    /// Generate the tab-delimited report text on demand
    pub fn get_report(&self) -> String {
        render_report(self.layout, &self.reports)
    }

    pub fn write_report<W: Write>(&self, out: &mut W) -> io::Result<()> {
        write_report(out, self.layout, &self.reports)
    }

    /// Generate the long-format per-method report on demand
    pub fn get_long_report(&self) -> String {
        render_long_report(
            &self.reports,
            &self.mapping,
            &self.name_preferences,
            self.tree.as_ref(),
        )
    }
}

/// Load every input, then estimate each contig's taxonomy.
pub fn compute_contig_taxonomy(opts: &RunOptions) -> Result<ContigTaxonomyResults> {
    // 1. Lookup tables
    let mapping = Arc::new(load_mapping_table(&opts.mapping_file)?);
    let name_preferences = Arc::new(match &opts.ncbi_megan_map {
        Some(path) => load_name_preferences(path)?,
        None => NamePreferences::new(),
    });

    // 2. Hits, grouped by contig and gene
    let hit_set = read_hit_table(&opts.parsed_blast)?;

    // 3. Reference taxa, if any
    let contig_refs = match &opts.contig_taxa_ref {
        Some(path) => Some(load_contig_references(path)?),
        None => None,
    };
    let reference = ReferenceTaxon::select(contig_refs, opts.sample_taxa_ref.clone());

    // 4. Taxonomy
    let tree = match &opts.ncbi_tree {
        Some(path) => load_ncbi_tree(path)?,
        None => {
            log::warn!("No NCBI tree given; every taxon label will be treated as unknown");
            NcbiTree::empty()
        }
    };
    let tree = Arc::new(tree.with_params(LcaStarParams::default()));

    // 5. Consensus
    let config = PipelineConfig {
        orf_summary: opts.orf_summary,
        all_methods: opts.all_methods,
        reference,
    };
    let layout = ReportLayout::new(config.all_methods, config.has_reference());
    let reports = estimate_contigs(
        &hit_set,
        &config,
        config.all_methods || opts.long_report,
        tree.as_ref(),
    )?;
    log::info!(
        "Estimated taxonomy for {} contigs (ORF summary: {})",
        reports.len(),
        config.orf_summary
    );

    Ok(ContigTaxonomyResults {
        reports,
        layout,
        mapping,
        name_preferences,
        tree,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LcaStarError;
    use crate::hits::parse_hit_table;
    use crate::report::read_report;
    use crate::resolver::testing::StubResolver;
    use crate::taxdb::tests::SMALL_TREE;
    use std::fs;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn hit_row(orf_id: &str, score: i64, taxon: &str) -> String {
        format!("{orf_id}\tq\t0\t{score}\t1e-10\t50\t100\t1\t100\tsome protein [{taxon}]\n")
    }

    struct Inputs {
        _dir: TempDir,
        opts: RunOptions,
    }

    fn write_inputs(hits: &str) -> Inputs {
        let dir = TempDir::new().unwrap();
        let blast = dir.path().join("hits.txt");
        let mapping = dir.path().join("mapping.txt");
        let tree = dir.path().join("tree.txt");
        fs::write(&blast, hits).unwrap();
        fs::write(&mapping, "read1\torig1\nc1\torig_c1\n").unwrap();
        fs::write(&tree, SMALL_TREE).unwrap();
        let opts = RunOptions {
            parsed_blast: blast,
            mapping_file: mapping,
            ncbi_tree: Some(tree),
            ..RunOptions::default()
        };
        Inputs { _dir: dir, opts }
    }

    fn scenario_hits() -> String {
        let mut hits = String::from("# parsed blast output\n");
        hits.push_str(&hit_row("c1_1", 50, "Bacteria"));
        hits.push_str(&hit_row("c1_1", 30, "Bacteria"));
        hits.push_str(&hit_row("c1_2", 40, "Archaea"));
        hits
    }

    #[test]
    fn test_besthit_scenario_with_stub_ancestor() {
        let hit_set = parse_hit_table(Cursor::new(scenario_hits()), "hits").unwrap();
        let resolver = StubResolver::new().with_ancestor(&["Bacteria", "Archaea"], "cellular organisms");
        let config = PipelineConfig { orf_summary: OrfSummary::BestHit, ..PipelineConfig::default() };

        let calls = consensus::resolve_contig_genes(&hit_set.contigs()[0], config.orf_summary, &resolver);
        let pairs: Vec<(&str, &str)> =
            calls.iter().map(|c| (c.gene.as_str(), c.taxon.as_str())).collect();
        assert_eq!(pairs, vec![("1", "Bacteria"), ("2", "Archaea")]);

        let reports = estimate_contigs(&hit_set, &config, false, &resolver).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].contig, "c1");
        assert_eq!(reports[0].lca_star.taxon, "cellular organisms");
    }

    #[test]
    fn test_compute_minimal_report_with_tree() {
        let mut inputs = write_inputs(&scenario_hits());
        inputs.opts.orf_summary = OrfSummary::BestHit;
        let results = compute_contig_taxonomy(&inputs.opts).unwrap();

        let text = results.get_report();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Contig\tLCAStar\tLCAStar_p");
        assert_eq!(lines.len(), 2);
        // Bacteria and Archaea only meet at the root
        assert!(lines[1].starts_with("c1\troot\t"));
    }

    #[test]
    fn test_all_methods_with_sample_reference_round_trips() {
        let mut hits = scenario_hits();
        hits.push_str(&hit_row("c2_1", 80, "Escherichia coli"));
        hits.push_str(&hit_row("c2_2", 70, "Salmonella enterica"));
        hits.push_str(&hit_row("c2_3", 60, "Escherichia coli"));
        let mut inputs = write_inputs(&hits);
        inputs.opts.all_methods = true;
        inputs.opts.sample_taxa_ref = Some("Escherichia coli".to_string());

        let results = compute_contig_taxonomy(&inputs.opts).unwrap();
        let text = results.get_report();
        for line in text.lines() {
            assert_eq!(line.split('\t').count(), 13);
        }

        let records = read_report(Cursor::new(text), "report").unwrap();
        assert_eq!(records.len(), results.reports.len());
        for (record, report) in records.iter().zip(&results.reports) {
            assert_eq!(record["Contig"], report.contig);
            assert_eq!(record["LCAStar"], report.lca_star.taxon);
            assert_eq!(record["Majority"], report.majority.as_ref().unwrap().taxon);
            assert_eq!(record["LCASquared"], report.lca_squared.as_ref().unwrap().taxon);
            assert_eq!(record["Original"], "Escherichia coli");
        }

        let c2 = &results.reports[1];
        assert_eq!(c2.contig, "c2");
        assert_eq!(c2.majority.as_ref().unwrap().taxon, "Escherichia coli");
        assert_eq!(c2.lca_squared.as_ref().unwrap().taxon, "Proteobacteria");
        assert_eq!(c2.lca_squared.as_ref().unwrap().distance, Some(1));
    }

    #[test]
    fn test_no_reference_means_no_distance_columns() {
        let mut inputs = write_inputs(&scenario_hits());
        inputs.opts.all_methods = true;
        let results = compute_contig_taxonomy(&inputs.opts).unwrap();
        let text = results.get_report();
        assert!(!text.contains("_dist"));
        assert!(!text.contains("_WTD"));
        for report in &results.reports {
            assert!(report.lca_star.distance.is_none());
            assert!(report.lca_star.weighted_distance.is_none());
        }
    }

    #[test]
    fn test_short_hit_row_aborts_pipeline() {
        let mut hits = scenario_hits();
        hits.push_str("c3_1\tq\t0\t10\t1e-5\t[Bacteria]\n");
        let inputs = write_inputs(&hits);
        let err = compute_contig_taxonomy(&inputs.opts).err().unwrap();
        assert!(matches!(err, LcaStarError::TooFewFields { found: 6, .. }));
    }

    #[test]
    fn test_missing_contig_reference_aborts_pipeline() {
        let mut inputs = write_inputs(&scenario_hits());
        let refs = inputs._dir.path().join("refs.txt");
        fs::write(&refs, "other\tBacteria\n").unwrap();
        inputs.opts.contig_taxa_ref = Some(refs);
        let err = compute_contig_taxonomy(&inputs.opts).err().unwrap();
        assert!(matches!(err, LcaStarError::MissingReference { .. }));
    }

    #[test]
    fn test_long_report_uses_mapping_and_preferred_names() {
        let mut inputs = write_inputs(&scenario_hits());
        let prefs = inputs._dir.path().join("map.ncbi");
        fs::write(&prefs, "2\tEubacteria\n").unwrap();
        inputs.opts.ncbi_megan_map = Some(prefs);
        inputs.opts.sample_taxa_ref = Some("Bacteria".to_string());
        inputs.opts.long_report = true;

        let results = compute_contig_taxonomy(&inputs.opts).unwrap();
        // the short report keeps its minimal layout
        assert_eq!(results.layout, ReportLayout::MinimalWithReference);
        let long = results.get_long_report();
        let lines: Vec<&str> = long.lines().collect();
        assert_eq!(lines.len(), 1 + 3);
        assert!(lines[1].starts_with("c1\torig_c1\tBacteria\t"));
        assert!(lines[1].ends_with("\troot (1);Eubacteria (2)"));
    }
}
