pub mod contig_call;
pub mod gene_call;

use rayon::prelude::*;

use crate::error::Result;
use crate::resolver::TaxonomyResolver;
use crate::types::{ContigReport, GeneHitSet, PipelineConfig};

pub use contig_call::{combine_gene_calls, estimate_contig, validate_estimate};
pub use gene_call::{resolve_contig_genes, resolve_gene_taxon, GeneTaxonCall};

/// Estimate every contig of `hit_set`. Contigs are independent and run on the
/// rayon pool; the returned reports keep hit-table contig order.
pub fn estimate_contigs(
    hit_set: &GeneHitSet,
    config: &PipelineConfig,
    all_methods: bool,
    resolver: &dyn TaxonomyResolver,
) -> Result<Vec<ContigReport>> {
    hit_set
        .contigs()
        .par_iter()
        .map(|contig| estimate_contig(contig, config, all_methods, resolver))
        .collect()
}
