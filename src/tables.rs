//src/tables.rs

use ahash::AHashMap;
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{LcaStarError, Result};
use crate::resolver::TaxonomyResolver;

/// working sequence id -> original sequence id
pub type MappingTable = AHashMap<String, String>;
/// taxonomy id -> preferred display name
pub type NamePreferences = AHashMap<String, String>;
/// contig -> known taxon
pub type ContigReferenceTable = AHashMap<String, String>;

/// Open a table for line-by-line reading; `.gz` paths are decompressed.
pub fn open_table<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead>> {
    let path = path.as_ref();
    let f = File::open(path).map_err(|e| LcaStarError::io(&path.display().to_string(), e))?;

    let is_gz = path
        .extension()
        .map(|ext| ext == "gz")
        .unwrap_or(false);

    let reader: Box<dyn BufRead> = if is_gz {
        Box::new(BufReader::new(MultiGzDecoder::new(f)))
    } else {
        Box::new(BufReader::new(f))
    };
    Ok(reader)
}

/// Parses a two-column tab-delimited table:
/// ```text
/// <key>\t<value>[\t...]
/// ```
/// Extra columns are ignored. A line with fewer than two fields aborts the
/// parse; `source` names the input in the error.
pub fn parse_two_column_table<R: BufRead>(
    reader: R,
    source: &str,
) -> Result<AHashMap<String, String>> {
    let mut table = AHashMap::new();

    for (idx, line_result) in reader.lines().enumerate() {
        let line = line_result.map_err(|e| LcaStarError::io(source, e))?;
        let parts: Vec<&str> = line.split('\t').map(str::trim).collect();

        if parts.len() < 2 {
            return Err(LcaStarError::TooFewFields {
                path: source.to_string(),
                line: idx + 1,
                expected: 2,
                found: parts.len(),
            });
        }
        table.insert(parts[0].to_string(), parts[1].to_string());
    }
    Ok(table)
}

fn load_two_column_table<P: AsRef<Path>>(path: P, what: &str) -> Result<AHashMap<String, String>> {
    let source = path.as_ref().display().to_string();
    let table = parse_two_column_table(open_table(&path)?, &source)?;
    log::info!("Loaded {} {what} entries from {source}", table.len());
    Ok(table)
}

/// Reads the sequence id mapping (`<working id>\t<original id>`).
pub fn load_mapping_table<P: AsRef<Path>>(path: P) -> Result<MappingTable> {
    load_two_column_table(path, "sequence mapping")
}

/// Reads the preferred-name overrides (`<taxid>\t<name>`).
pub fn load_name_preferences<P: AsRef<Path>>(path: P) -> Result<NamePreferences> {
    load_two_column_table(path, "preferred name")
}

/// Reads the per-contig reference taxa (`<contig>\t<taxon>`).
pub fn load_contig_references<P: AsRef<Path>>(path: P) -> Result<ContigReferenceTable> {
    load_two_column_table(path, "contig reference")
}

/// Render a taxonomy id as `Name (id)`, preferring the override table, then
/// the resolver's own name, else `Unknown (id)`.
pub fn preferred_name(
    id: &str,
    preferences: &NamePreferences,
    resolver: &dyn TaxonomyResolver,
) -> String {
    if let Some(name) = preferences.get(id) {
        return format!("{name} ({id})");
    }
    match resolver.translate_id(id) {
        Some(name) => format!("{name} ({id})"),
        None => format!("Unknown ({id})"),
    }
}

/// Render a taxon label for display. Labels that resolve to a taxonomy id
/// go through [`preferred_name`]; anything else is shown as-is.
pub fn display_taxon(
    taxon: &str,
    preferences: &NamePreferences,
    resolver: &dyn TaxonomyResolver,
) -> String {
    match resolver.resolve_id(taxon) {
        Some(id) => preferred_name(&id, preferences, resolver),
        None => taxon.to_string(),
    }
}
