//src/types.rs

use ahash::AHashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{LcaStarError, Result};

/// Label used for a gene or contig that has no usable hits.
pub const ROOT_TAXON: &str = "root";

/// One parsed row of the homology hit table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomologyHit {
    pub contig: String,
    pub gene: String,
    pub taxon: String,
    pub score: i64,
}

/// All hits of a single gene (ORF), in file order.
#[derive(Debug, Clone, Default)]
pub struct GeneHits {
    pub gene: String,
    pub hits: Vec<HomologyHit>,
}

/// The genes of a single contig, in order of first appearance.
#[derive(Debug, Clone, Default)]
pub struct ContigHits {
    pub contig: String,
    pub genes: Vec<GeneHits>,
    gene_index: AHashMap<String, usize>,
}

impl ContigHits {
    fn new(contig: &str) -> Self {
        Self {
            contig: contig.to_string(),
            genes: Vec::new(),
            gene_index: AHashMap::new(),
        }
    }

    pub fn gene(&self, gene: &str) -> Option<&GeneHits> {
        self.gene_index.get(gene).map(|&i| &self.genes[i])
    }
}

/// contig -> gene -> hits, keeping first-appearance order at both levels so
/// the report is emitted in hit-table order.
#[derive(Debug, Clone, Default)]
pub struct GeneHitSet {
    contigs: Vec<ContigHits>,
    contig_index: AHashMap<String, usize>,
}

impl GeneHitSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure `contig`/`gene` exist and return the gene's hit list.
    pub fn register_gene(&mut self, contig: &str, gene: &str) -> &mut Vec<HomologyHit> {
        let ci = match self.contig_index.get(contig) {
            Some(&i) => i,
            None => {
                self.contigs.push(ContigHits::new(contig));
                self.contig_index.insert(contig.to_string(), self.contigs.len() - 1);
                self.contigs.len() - 1
            }
        };
        let entry = &mut self.contigs[ci];
        let gi = match entry.gene_index.get(gene) {
            Some(&i) => i,
            None => {
                entry.genes.push(GeneHits { gene: gene.to_string(), hits: Vec::new() });
                entry.gene_index.insert(gene.to_string(), entry.genes.len() - 1);
                entry.genes.len() - 1
            }
        };
        &mut entry.genes[gi].hits
    }

    pub fn push(&mut self, hit: HomologyHit) {
        let contig = hit.contig.clone();
        let gene = hit.gene.clone();
        self.register_gene(&contig, &gene).push(hit);
    }

    pub fn contigs(&self) -> &[ContigHits] {
        &self.contigs
    }

    pub fn get(&self, contig: &str) -> Option<&ContigHits> {
        self.contig_index.get(contig).map(|&i| &self.contigs[i])
    }

    pub fn num_contigs(&self) -> usize {
        self.contigs.len()
    }

    pub fn num_genes(&self) -> usize {
        self.contigs.iter().map(|c| c.genes.len()).sum()
    }

    pub fn num_hits(&self) -> usize {
        self.contigs
            .iter()
            .flat_map(|c| c.genes.iter())
            .map(|g| g.hits.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.contigs.is_empty()
    }
}

/// How the hits of one gene collapse into a single taxon call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrfSummary {
    #[default]
    Lca,
    BestHit,
    OrfMajority,
}

impl OrfSummary {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrfSummary::Lca => "lca",
            OrfSummary::BestHit => "besthit",
            OrfSummary::OrfMajority => "orf_majority",
        }
    }
}

impl FromStr for OrfSummary {
    type Err = LcaStarError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "lca" => Ok(OrfSummary::Lca),
            "besthit" => Ok(OrfSummary::BestHit),
            "orf_majority" => Ok(OrfSummary::OrfMajority),
            other => Err(LcaStarError::InvalidOrfSummary(other.to_string())),
        }
    }
}

impl fmt::Display for OrfSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three contig-level estimators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Estimator {
    LcaStar,
    Majority,
    LcaSquared,
}

impl Estimator {
    pub const ALL: [Estimator; 3] = [Estimator::LcaStar, Estimator::Majority, Estimator::LcaSquared];

    /// Method name used by the long-format report.
    pub fn method_name(&self) -> &'static str {
        match self {
            Estimator::LcaStar => "LCA_Star",
            Estimator::Majority => "Majority",
            Estimator::LcaSquared => "LCA_Squared",
        }
    }
}

/// A contig-level taxonomy estimate plus its optional statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct ContigEstimate {
    pub taxon: String,
    pub confidence: Option<f64>,
    pub distance: Option<u32>,
    pub weighted_distance: Option<f64>,
}

impl ContigEstimate {
    pub fn new(taxon: impl Into<String>, confidence: Option<f64>) -> Self {
        Self {
            taxon: taxon.into(),
            confidence,
            distance: None,
            weighted_distance: None,
        }
    }
}

/// Everything computed for one contig; one report row.
#[derive(Debug, Clone, PartialEq)]
pub struct ContigReport {
    pub contig: String,
    pub lca_star: ContigEstimate,
    pub majority: Option<ContigEstimate>,
    pub lca_squared: Option<ContigEstimate>,
    /// Known taxon of the contig, if a reference was supplied
    pub reference: Option<String>,
}

impl ContigReport {
    pub fn estimate(&self, estimator: Estimator) -> Option<&ContigEstimate> {
        match estimator {
            Estimator::LcaStar => Some(&self.lca_star),
            Estimator::Majority => self.majority.as_ref(),
            Estimator::LcaSquared => self.lca_squared.as_ref(),
        }
    }
}

/// Ground truth to validate estimates against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceTaxon {
    /// contig -> known taxon
    PerContig(AHashMap<String, String>),
    /// One taxon shared by every contig (e.g. a single-cell sample)
    Sample(String),
}

impl ReferenceTaxon {
    /// Pick the active reference source. A non-empty per-contig table wins
    /// over the sample-wide value.
    pub fn select(
        per_contig: Option<AHashMap<String, String>>,
        sample: Option<String>,
    ) -> Option<Self> {
        match (per_contig, sample) {
            (Some(table), sample) if !table.is_empty() => {
                if sample.is_some() {
                    log::warn!("Both contig and sample references given; using the contig table");
                }
                Some(ReferenceTaxon::PerContig(table))
            }
            (_, Some(sample)) => Some(ReferenceTaxon::Sample(sample)),
            _ => None,
        }
    }

    /// Reference taxon for `contig`. A contig absent from a per-contig
    /// table is fatal.
    pub fn for_contig(&self, contig: &str) -> Result<&str> {
        match self {
            ReferenceTaxon::PerContig(table) => table
                .get(contig)
                .map(String::as_str)
                .ok_or_else(|| LcaStarError::MissingReference { contig: contig.to_string() }),
            ReferenceTaxon::Sample(taxon) => Ok(taxon),
        }
    }
}

/// Run-level settings handed to the consensus pipeline.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub orf_summary: OrfSummary,
    /// Compute and report Majority and LCA^2 besides LCA*
    pub all_methods: bool,
    pub reference: Option<ReferenceTaxon>,
}

impl PipelineConfig {
    pub fn has_reference(&self) -> bool {
        self.reference.is_some()
    }
}
