// src/consensus/contig_call.rs

use crate::error::Result;
use crate::resolver::TaxonomyResolver;
use crate::types::{ContigEstimate, ContigHits, ContigReport, PipelineConfig};

use super::gene_call::resolve_contig_genes;

/// Fill in the distance fields of `estimate` against the known taxon.
pub fn validate_estimate(
    estimate: &mut ContigEstimate,
    reference: &str,
    resolver: &dyn TaxonomyResolver,
) {
    estimate.distance = resolver.distance(&estimate.taxon, reference);
    estimate.weighted_distance = resolver.weighted_distance(&estimate.taxon, reference);
}

/// LCA*, and with `all_methods` also Majority and LCA^2, over a list of
/// gene-level calls. No reference validation happens here.
pub fn combine_gene_calls(
    taxa: &[String],
    all_methods: bool,
    resolver: &dyn TaxonomyResolver,
) -> (ContigEstimate, Option<ContigEstimate>, Option<ContigEstimate>) {
    let (star, star_p) = resolver.weighted_consensus(taxa);
    let lca_star = ContigEstimate::new(star, Some(star_p));

    if !all_methods {
        return (lca_star, None, None);
    }

    let majority = resolver.majority_vote(taxa);
    let majority_p = resolver.significance(taxa, &majority);
    let lca_squared = resolver.lowest_common_ancestor(taxa);

    (
        lca_star,
        Some(ContigEstimate::new(majority, Some(majority_p))),
        Some(ContigEstimate::new(lca_squared, None)),
    )
}

/// Resolve every gene of `contig`, combine the calls, and validate against
/// the configured reference. Fails only if a per-contig reference is missing.
pub fn estimate_contig(
    contig: &ContigHits,
    config: &PipelineConfig,
    all_methods: bool,
    resolver: &dyn TaxonomyResolver,
) -> Result<ContigReport> {
    let taxa: Vec<String> = resolve_contig_genes(contig, config.orf_summary, resolver)
        .into_iter()
        .map(|call| call.taxon)
        .collect();

    let (mut lca_star, mut majority, mut lca_squared) =
        combine_gene_calls(&taxa, all_methods, resolver);

    let reference = match &config.reference {
        Some(source) => Some(source.for_contig(&contig.contig)?.to_string()),
        None => None,
    };

    if let Some(real) = reference.as_deref() {
        validate_estimate(&mut lca_star, real, resolver);
        for estimate in [majority.as_mut(), lca_squared.as_mut()].into_iter().flatten() {
            validate_estimate(estimate, real, resolver);
        }
    }

    log::debug!(
        "{}: {} genes -> LCA* {}",
        contig.contig,
        taxa.len(),
        lca_star.taxon
    );

    Ok(ContigReport {
        contig: contig.contig.clone(),
        lca_star,
        majority,
        lca_squared,
        reference,
    })
}
