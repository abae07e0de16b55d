//src/lcastar.rs

use ahash::AHashMap;
use statrs::distribution::{ChiSquared, ContinuousCDF};
use std::collections::BTreeSet;

use crate::resolver::TaxonomyResolver;
use crate::taxdb::NcbiTree;
use crate::types::ROOT_TAXON;

const ENTROPY_EPSILON: f64 = 1e-12;

/// `x * ln(x / y)` with the 0 * ln(0) = 0 convention.
fn xlogx_over(x: f64, y: f64) -> f64 {
    if x <= 0.0 {
        0.0
    } else {
        x * (x / y).ln()
    }
}

/// Likelihood-ratio test of `support` successes out of `total` against the
/// majority threshold `alpha`; returns P(chi^2_1 >= G).
pub fn likelihood_ratio_pvalue(support: usize, total: usize, alpha: f64) -> f64 {
    if total == 0 {
        return 1.0;
    }
    let s = support as f64;
    let n = total as f64;
    let g = 2.0 * (xlogx_over(s, n * alpha) + xlogx_over(n - s, n * (1.0 - alpha)));
    if !g.is_finite() || g <= 0.0 {
        return if g.is_finite() { 1.0 } else { 0.0 };
    }
    match ChiSquared::new(1.0) {
        Ok(dist) => dist.sf(g).clamp(0.0, 1.0),
        Err(_) => 1.0,
    }
}

/// Shannon entropy (nats) of a set of counts.
fn entropy(counts: &mut [usize]) -> f64 {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }
    // fixed summation order keeps the result independent of map iteration order
    counts.sort_unstable();
    let total = total as f64;
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.ln()
        })
        .sum()
}

impl NcbiTree {
    /// Label to node; unknown labels hang off the root.
    fn node_or_root(&self, label: &str) -> u32 {
        self.lookup(label).unwrap_or_else(|| self.root())
    }

    /// How many of `nodes` have `candidate` on their lineage.
    fn clade_support(&self, nodes: &[u32], candidate: u32) -> usize {
        nodes
            .iter()
            .filter(|&&n| self.lineage(n).contains(&candidate))
            .count()
    }

    /// Every node's count of labels whose lineage passes through it.
    fn clade_counts(&self, nodes: &[u32]) -> AHashMap<u32, usize> {
        let mut counts: AHashMap<u32, usize> = AHashMap::new();
        for &n in nodes {
            for &anc in self.lineage(n).iter() {
                *counts.entry(anc).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Entropy of the label distribution inside the clade of `node`.
    fn clade_entropy(&self, nodes: &[u32], node: u32) -> f64 {
        let mut per_label: AHashMap<u32, usize> = AHashMap::new();
        for &n in nodes {
            if self.lineage(n).contains(&node) {
                *per_label.entry(n).or_insert(0) += 1;
            }
        }
        let mut counts: Vec<usize> = per_label.values().copied().collect();
        entropy(&mut counts)
    }

    fn node_significance(&self, nodes: &[u32], candidate: u32) -> f64 {
        let support = self.clade_support(nodes, candidate);
        likelihood_ratio_pvalue(support, nodes.len(), self.params.alpha)
    }

    /// LCA*: among nodes covering at least `alpha` of the labels, pick the one
    /// whose clade has the lowest label entropy (deeper wins ties).
    pub fn lca_star_node(&self, nodes: &[u32]) -> u32 {
        let total = nodes.len();
        if total == 0 {
            return self.root();
        }
        let params = self.params;

        let mut best: Option<(f64, usize, u32)> = None;
        for (node, count) in self.clade_counts(nodes) {
            let depth = self.depth(node);
            if (count as f64) / (total as f64) < params.alpha
                || depth < params.min_depth
                || count < params.min_reads
            {
                continue;
            }
            let h = self.clade_entropy(nodes, node);
            let better = match best {
                None => true,
                Some((best_h, best_depth, best_node)) => {
                    if (h - best_h).abs() > ENTROPY_EPSILON {
                        h < best_h
                    } else if depth != best_depth {
                        depth > best_depth
                    } else {
                        node < best_node
                    }
                }
            };
            if better {
                best = Some((h, depth, node));
            }
        }

        best.map(|(_, _, node)| node).unwrap_or_else(|| self.root())
    }
}

impl TaxonomyResolver for NcbiTree {
    fn lowest_common_ancestor(&self, taxa: &[String]) -> String {
        let known: Vec<u32> = taxa.iter().filter_map(|t| self.lookup(t)).collect();
        match self.lca_all(&known) {
            Some(node) => self.label(node),
            None => ROOT_TAXON.to_string(),
        }
    }

    fn majority_vote(&self, taxa: &[String]) -> String {
        let mut counts: AHashMap<&str, usize> = AHashMap::new();
        for t in taxa {
            *counts.entry(t.as_str()).or_insert(0) += 1;
        }
        let Some(&max_count) = counts.values().max() else {
            return ROOT_TAXON.to_string();
        };
        let tied: BTreeSet<&str> = counts
            .into_iter()
            .filter(|&(_, c)| c == max_count)
            .map(|(t, _)| t)
            .collect();

        if tied.len() == 1 {
            return tied.into_iter().next().unwrap_or(ROOT_TAXON).to_string();
        }

        // Tie-break by LCA among the tied labels the tree knows.
        let known: Vec<u32> = tied.iter().filter_map(|t| self.lookup(t)).collect();
        match self.lca_all(&known) {
            Some(node) => self.label(node),
            None => tied.into_iter().next().unwrap_or(ROOT_TAXON).to_string(),
        }
    }

    fn significance(&self, taxa: &[String], candidate: &str) -> f64 {
        match self.lookup(candidate) {
            Some(id) => {
                let nodes: Vec<u32> = taxa.iter().map(|t| self.node_or_root(t)).collect();
                self.node_significance(&nodes, id)
            }
            None => {
                let support = taxa.iter().filter(|t| t.as_str() == candidate).count();
                likelihood_ratio_pvalue(support, taxa.len(), self.params.alpha)
            }
        }
    }

    fn weighted_consensus(&self, taxa: &[String]) -> (String, f64) {
        let nodes: Vec<u32> = taxa.iter().map(|t| self.node_or_root(t)).collect();
        let chosen = self.lca_star_node(&nodes);
        (self.label(chosen), self.node_significance(&nodes, chosen))
    }

    fn distance(&self, a: &str, b: &str) -> Option<u32> {
        Some(self.edge_distance(self.lookup(a)?, self.lookup(b)?))
    }

    fn weighted_distance(&self, a: &str, b: &str) -> Option<f64> {
        Some(self.weighted_edge_distance(self.lookup(a)?, self.lookup(b)?))
    }

    fn translate_id(&self, id: &str) -> Option<String> {
        let taxid: u32 = id.parse().ok()?;
        self.name(taxid).map(str::to_string)
    }

    fn resolve_id(&self, taxon: &str) -> Option<String> {
        self.lookup(taxon).map(|id| id.to_string())
    }

    fn lineage_ids(&self, taxon: &str) -> Vec<String> {
        match self.lookup(taxon) {
            Some(id) => self.lineage(id).iter().map(|n| n.to_string()).collect(),
            None => Vec::new(),
        }
    }
}
