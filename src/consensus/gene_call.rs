// src/consensus/gene_call.rs

use crate::resolver::TaxonomyResolver;
use crate::types::{ContigHits, HomologyHit, OrfSummary, ROOT_TAXON};

/// The single taxon assigned to one gene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneTaxonCall {
    pub gene: String,
    pub taxon: String,
}

/// Collapse one gene's hits into a taxon. A gene without hits is `root`
/// under every strategy.
pub fn resolve_gene_taxon(
    hits: &[HomologyHit],
    strategy: OrfSummary,
    resolver: &dyn TaxonomyResolver,
) -> String {
    if hits.is_empty() {
        return ROOT_TAXON.to_string();
    }

    match strategy {
        OrfSummary::BestHit => {
            // stable: the first of several equal top scores wins
            let mut ranked: Vec<&HomologyHit> = hits.iter().collect();
            ranked.sort_by(|a, b| b.score.cmp(&a.score));
            ranked[0].taxon.clone()
        }
        OrfSummary::OrfMajority => {
            let taxa: Vec<String> = hits.iter().map(|h| h.taxon.clone()).collect();
            resolver.majority_vote(&taxa)
        }
        OrfSummary::Lca => {
            let taxa: Vec<String> = hits.iter().map(|h| h.taxon.clone()).collect();
            resolver.lowest_common_ancestor(&taxa)
        }
    }
}

/// One call per gene of `contig`, in gene order.
pub fn resolve_contig_genes(
    contig: &ContigHits,
    strategy: OrfSummary,
    resolver: &dyn TaxonomyResolver,
) -> Vec<GeneTaxonCall> {
    contig
        .genes
        .iter()
        .map(|g| GeneTaxonCall {
            gene: g.gene.clone(),
            taxon: resolve_gene_taxon(&g.hits, strategy, resolver),
        })
        .collect()
}
