//src/resolver.rs

/// The taxonomy primitives the consensus pipeline needs.
///
/// Taxa are passed around as labels (names as they appear in the hit table).
/// How a resolver treats labels it does not know is up to the resolver.
/// `Sync` is required because contigs are resolved on the rayon pool.
pub trait TaxonomyResolver: Sync {
    /// Lowest common ancestor of all `taxa`.
    fn lowest_common_ancestor(&self, taxa: &[String]) -> String;

    /// Plurality label of `taxa`, with the resolver's own tie-break.
    fn majority_vote(&self, taxa: &[String]) -> String;

    /// p-value-like support of `candidate` among `taxa`.
    fn significance(&self, taxa: &[String], candidate: &str) -> f64;

    /// Entropy-weighted LCA (LCA*) and its confidence in [0, 1].
    fn weighted_consensus(&self, taxa: &[String]) -> (String, f64);

    /// Number of tree edges between `a` and `b`, if both are known.
    fn distance(&self, a: &str, b: &str) -> Option<u32>;

    /// Weighted topological distance between `a` and `b`, if both are known.
    fn weighted_distance(&self, a: &str, b: &str) -> Option<f64>;

    /// Scientific name of taxonomy id `id`.
    fn translate_id(&self, id: &str) -> Option<String>;

    /// Taxonomy id of a label, if it has one.
    fn resolve_id(&self, _taxon: &str) -> Option<String> {
        None
    }

    /// Taxonomy ids from `taxon` up to the root (inclusive both ends).
    fn lineage_ids(&self, _taxon: &str) -> Vec<String> {
        Vec::new()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::TaxonomyResolver;
    use crate::types::ROOT_TAXON;
    use ahash::AHashMap;

    fn pair_key(a: &str, b: &str) -> (String, String) {
        if a <= b {
            (a.to_string(), b.to_string())
        } else {
            (b.to_string(), a.to_string())
        }
    }

    /// Hand-wired resolver with a known answer for every query a test makes.
    ///
    /// - LCA: identical labels -> that label, configured sets -> configured
    ///   ancestor, anything else -> `root`.
    /// - Majority: highest count, ties -> smallest label.
    /// - LCA*: strict majority label if one exists, else the LCA; confidence
    ///   is the supporting fraction.
    #[derive(Default)]
    pub(crate) struct StubResolver {
        ancestors: AHashMap<Vec<String>, String>,
        distances: AHashMap<(String, String), (u32, f64)>,
        names: AHashMap<String, String>,
        lineages: AHashMap<String, Vec<String>>,
    }

    impl StubResolver {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn with_ancestor(mut self, taxa: &[&str], ancestor: &str) -> Self {
            let mut key: Vec<String> = taxa.iter().map(|t| t.to_string()).collect();
            key.sort();
            key.dedup();
            self.ancestors.insert(key, ancestor.to_string());
            self
        }

        pub(crate) fn with_distance(mut self, a: &str, b: &str, dist: u32, wtd: f64) -> Self {
            self.distances.insert(pair_key(a, b), (dist, wtd));
            self
        }

        pub(crate) fn with_name(mut self, id: &str, name: &str) -> Self {
            self.names.insert(id.to_string(), name.to_string());
            self
        }

        pub(crate) fn with_lineage(mut self, name: &str, ids: &[&str]) -> Self {
            self.lineages
                .insert(name.to_string(), ids.iter().map(|s| s.to_string()).collect());
            self
        }

        fn support(taxa: &[String], candidate: &str) -> f64 {
            if taxa.is_empty() {
                return 0.0;
            }
            taxa.iter().filter(|t| t.as_str() == candidate).count() as f64 / taxa.len() as f64
        }
    }

    impl TaxonomyResolver for StubResolver {
        fn lowest_common_ancestor(&self, taxa: &[String]) -> String {
            let mut key: Vec<String> = taxa.to_vec();
            key.sort();
            key.dedup();
            match key.len() {
                0 => ROOT_TAXON.to_string(),
                1 => key[0].clone(),
                _ => self
                    .ancestors
                    .get(&key)
                    .cloned()
                    .unwrap_or_else(|| ROOT_TAXON.to_string()),
            }
        }

        fn majority_vote(&self, taxa: &[String]) -> String {
            let mut counts: AHashMap<&str, usize> = AHashMap::new();
            for t in taxa {
                *counts.entry(t.as_str()).or_insert(0) += 1;
            }
            counts
                .into_iter()
                .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
                .map(|(t, _)| t.to_string())
                .unwrap_or_else(|| ROOT_TAXON.to_string())
        }

        fn significance(&self, taxa: &[String], candidate: &str) -> f64 {
            Self::support(taxa, candidate)
        }

        fn weighted_consensus(&self, taxa: &[String]) -> (String, f64) {
            let majority = self.majority_vote(taxa);
            let support = Self::support(taxa, &majority);
            if support > 0.5 {
                (majority, support)
            } else {
                let lca = self.lowest_common_ancestor(taxa);
                let support = Self::support(taxa, &lca);
                (lca, support)
            }
        }

        fn distance(&self, a: &str, b: &str) -> Option<u32> {
            if a == b {
                return Some(0);
            }
            self.distances.get(&pair_key(a, b)).map(|d| d.0)
        }

        fn weighted_distance(&self, a: &str, b: &str) -> Option<f64> {
            if a == b {
                return Some(0.0);
            }
            self.distances.get(&pair_key(a, b)).map(|d| d.1)
        }

        fn translate_id(&self, id: &str) -> Option<String> {
            self.names.get(id).cloned()
        }

        fn resolve_id(&self, taxon: &str) -> Option<String> {
            self.names
                .iter()
                .find(|(_, name)| name.as_str() == taxon)
                .map(|(id, _)| id.clone())
        }

        fn lineage_ids(&self, taxon: &str) -> Vec<String> {
            self.lineages.get(taxon).cloned().unwrap_or_default()
        }
    }
}
