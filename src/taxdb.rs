//src/taxdb.rs

use ahash::{AHashMap, AHashSet};
use parking_lot::RwLock;
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;

use crate::error::{LcaStarError, Result};
use crate::tables::open_table;
use crate::types::ROOT_TAXON;

pub type ParentMap = AHashMap<u32, u32>;
pub type NameMap = AHashMap<u32, String>;

/// NCBI root taxid, used when the tree file does not declare a self-parented node.
pub const DEFAULT_ROOT_TAXID: u32 = 1;

/// Tuning knobs of the LCA* estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LcaStarParams {
    /// Shallowest depth (root = 0) an LCA* answer may sit at
    pub min_depth: usize,
    /// Fraction of labels a node must cover to be considered
    pub alpha: f64,
    /// Minimum number of labels a node must cover
    pub min_reads: usize,
}

impl Default for LcaStarParams {
    fn default() -> Self {
        Self { min_depth: 1, alpha: 0.51, min_reads: 1 }
    }
}

/// Taxonomic hierarchy keyed by NCBI taxid, with label lookup by name.
pub struct NcbiTree {
    parent_map: ParentMap,
    name_map: NameMap,
    name_to_id: AHashMap<String, u32>,
    lower_name_to_id: AHashMap<String, u32>,
    root: u32,
    lineage_cache: RwLock<AHashMap<u32, Arc<[u32]>>>,
    pub(crate) params: LcaStarParams,
}

impl NcbiTree {
    /// A tree with only a root; every label is unknown.
    pub fn empty() -> Self {
        Self::from_maps(ParentMap::new(), NameMap::new(), Vec::new())
    }

    fn from_maps(parent_map: ParentMap, name_map: NameMap, name_order: Vec<(String, u32)>) -> Self {
        let root = parent_map
            .iter()
            .find(|(child, parent)| child == parent)
            .map(|(&child, _)| child)
            .unwrap_or(DEFAULT_ROOT_TAXID);

        // First occurrence of a name wins.
        let mut name_to_id = AHashMap::with_capacity(name_order.len());
        let mut lower_name_to_id = AHashMap::with_capacity(name_order.len());
        for (name, taxid) in name_order {
            lower_name_to_id.entry(name.to_lowercase()).or_insert(taxid);
            name_to_id.entry(name).or_insert(taxid);
        }

        Self {
            parent_map,
            name_map,
            name_to_id,
            lower_name_to_id,
            root,
            lineage_cache: RwLock::new(AHashMap::new()),
            params: LcaStarParams::default(),
        }
    }

    pub fn with_params(mut self, params: LcaStarParams) -> Self {
        self.params = params;
        self
    }

    pub fn root(&self) -> u32 {
        self.root
    }

    /// Number of nodes loaded.
    pub fn len(&self) -> usize {
        self.parent_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent_map.is_empty()
    }

    /// Taxid for a label: exact name, then case-insensitive name.
    /// `root` always resolves to the root node.
    pub fn lookup(&self, label: &str) -> Option<u32> {
        if let Some(&id) = self.name_to_id.get(label) {
            return Some(id);
        }
        if let Some(&id) = self.lower_name_to_id.get(&label.to_lowercase()) {
            return Some(id);
        }
        if label == ROOT_TAXON {
            return Some(self.root);
        }
        None
    }

    pub fn name(&self, taxid: u32) -> Option<&str> {
        self.name_map.get(&taxid).map(String::as_str)
    }

    /// Label to report for a node.
    pub fn label(&self, taxid: u32) -> String {
        if taxid == self.root {
            return ROOT_TAXON.to_string();
        }
        self.name(taxid)
            .map(str::to_string)
            .unwrap_or_else(|| taxid.to_string())
    }

    /// Path from `taxid` up to and including the root.
    pub fn lineage(&self, taxid: u32) -> Arc<[u32]> {
        if let Some(cached) = self.lineage_cache.read().get(&taxid) {
            return Arc::clone(cached);
        }

        let mut path = Vec::with_capacity(16);
        let mut seen = AHashSet::with_capacity(16);
        let mut node = taxid;
        loop {
            if !seen.insert(node) {
                break; // cycle in a malformed tree
            }
            path.push(node);
            if node == self.root {
                break;
            }
            match self.parent_map.get(&node) {
                Some(&p) if p != node => node = p,
                _ => break,
            }
        }
        if path.last() != Some(&self.root) {
            path.push(self.root);
        }

        let lineage: Arc<[u32]> = Arc::from(path);
        self.lineage_cache.write().insert(taxid, Arc::clone(&lineage));
        lineage
    }

    /// Depth of a node, root = 0.
    pub fn depth(&self, taxid: u32) -> usize {
        self.lineage(taxid).len() - 1
    }

    /// Return the lowest common ancestor (LCA) of `a` and `b`.
    pub fn lca(&self, a: u32, b: u32) -> u32 {
        let a_anc: AHashSet<u32> = self.lineage(a).iter().copied().collect();
        self.lineage(b)
            .iter()
            .copied()
            .find(|n| a_anc.contains(n))
            .unwrap_or(self.root)
    }

    /// LCA of several nodes; `None` for an empty slice.
    pub fn lca_all(&self, taxids: &[u32]) -> Option<u32> {
        let (&first, rest) = taxids.split_first()?;
        Some(rest.iter().fold(first, |acc, &t| self.lca(acc, t)))
    }

    /// Edge count between two nodes.
    pub fn edge_distance(&self, a: u32, b: u32) -> u32 {
        let anc = self.lca(a, b);
        let anc_depth = self.depth(anc);
        (self.depth(a) + self.depth(b) - 2 * anc_depth) as u32
    }

    /// Sum of edge weights between two nodes, where the edge above a node at
    /// depth `d` weighs `2^-(d-1)`.
    pub fn weighted_edge_distance(&self, a: u32, b: u32) -> f64 {
        let anc = self.lca(a, b);
        let anc_depth = self.depth(anc);
        let side = |node: u32| -> f64 {
            let depth = self.depth(node);
            (anc_depth + 1..=depth)
                .map(|d| 0.5f64.powi(d as i32 - 1))
                .sum()
        };
        side(a) + side(b)
    }
}

/// Parses an NCBI tree file in the format:
/// ```text
/// <name>\t<taxid>\t<parent taxid>
/// ```
/// Malformed rows are skipped.
pub fn parse_ncbi_tree<R: BufRead>(reader: R, source: &str) -> Result<NcbiTree> {
    let mut parent_map = ParentMap::new();
    let mut name_map = NameMap::new();
    let mut name_order = Vec::new();
    let mut skipped = 0usize;

    for line_result in reader.lines() {
        let line = line_result.map_err(|e| LcaStarError::io(source, e))?;
        let parts: Vec<&str> = line.split('\t').map(str::trim).collect();
        if parts.len() != 3 {
            skipped += 1;
            continue;
        }

        let (Ok(taxid), Ok(parentid)) = (parts[1].parse::<u32>(), parts[2].parse::<u32>()) else {
            skipped += 1;
            continue;
        };

        parent_map.insert(taxid, parentid);
        name_map.entry(taxid).or_insert_with(|| parts[0].to_string());
        name_order.push((parts[0].to_string(), taxid));
    }

    if skipped > 0 {
        log::warn!("{source}: skipped {skipped} malformed tree rows");
    }
    log::info!("Loaded {} taxonomy nodes from {source}", parent_map.len());
    Ok(NcbiTree::from_maps(parent_map, name_map, name_order))
}

/// Load the tree at `path` (plain or `.gz`).
pub fn load_ncbi_tree<P: AsRef<Path>>(path: P) -> Result<NcbiTree> {
    let source = path.as_ref().display().to_string();
    parse_ncbi_tree(open_table(&path)?, &source)
}
