//src/hits.rs

use std::io::BufRead;
use std::path::Path;

use crate::error::{LcaStarError, Result};
use crate::tables::open_table;
use crate::types::{GeneHitSet, HomologyHit};

/// Minimum number of tab-separated fields on a hit row.
pub const MIN_HIT_FIELDS: usize = 10;

const ORF_ID_FIELD: usize = 0;
const BITSCORE_FIELD: usize = 3;
const PRODUCT_FIELD: usize = 9;

/// Split `<contig>_<orf number>` at the last underscore.
/// Returns `None` if the suffix is not a non-empty run of digits.
pub fn split_orf_id(id: &str) -> Option<(&str, &str)> {
    let (contig, orf) = id.rsplit_once('_')?;
    if orf.is_empty() || !orf.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((contig, orf))
}

/// Pull the taxon out of an annotation like `hypothetical protein [Escherichia coli]`.
/// Spans from the first `[` to the last `]`.
pub fn extract_taxon(annotation: &str) -> Option<&str> {
    let start = annotation.find('[')?;
    let end = annotation.rfind(']')?;
    if end <= start + 1 {
        return None;
    }
    Some(&annotation[start + 1..end])
}

/// Parses a parsed-BLAST/LAST annotation table.
///
/// Comment (`#`) and blank lines are ignored. Rows whose ORF id does not look
/// like `<contig>_<n>` are skipped; rows without a bracketed taxon still
/// register their gene (which may then end up with zero hits). Short rows and
/// non-integer scores abort the parse.
pub fn parse_hit_table<R: BufRead>(reader: R, source: &str) -> Result<GeneHitSet> {
    let mut hit_set = GeneHitSet::new();
    let mut skipped_ids = 0usize;
    let mut skipped_taxa = 0usize;

    for (idx, line_result) in reader.lines().enumerate() {
        let line = line_result.map_err(|e| LcaStarError::io(source, e))?;
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
        if fields.len() < MIN_HIT_FIELDS {
            return Err(LcaStarError::TooFewFields {
                path: source.to_string(),
                line: idx + 1,
                expected: MIN_HIT_FIELDS,
                found: fields.len(),
            });
        }

        let Some((contig, gene)) = split_orf_id(fields[ORF_ID_FIELD]) else {
            skipped_ids += 1;
            continue;
        };
        let hits = hit_set.register_gene(contig, gene);

        let Some(taxon) = extract_taxon(fields[PRODUCT_FIELD]) else {
            skipped_taxa += 1;
            continue;
        };

        let raw_score = fields[BITSCORE_FIELD];
        let score: i64 = raw_score.parse().map_err(|_| LcaStarError::InvalidScore {
            path: source.to_string(),
            line: idx + 1,
            value: raw_score.to_string(),
        })?;

        hits.push(HomologyHit {
            contig: contig.to_string(),
            gene: gene.to_string(),
            taxon: taxon.to_string(),
            score,
        });
    }

    if skipped_ids > 0 || skipped_taxa > 0 {
        log::debug!(
            "{source}: skipped {skipped_ids} rows with malformed ORF ids, {skipped_taxa} rows without a taxon"
        );
    }
    log::info!(
        "Parsed {} hits over {} genes in {} contigs from {source}",
        hit_set.num_hits(),
        hit_set.num_genes(),
        hit_set.num_contigs()
    );
    Ok(hit_set)
}

/// Read the hit table at `path` (plain or `.gz`).
pub fn read_hit_table<P: AsRef<Path>>(path: P) -> Result<GeneHitSet> {
    let source = path.as_ref().display().to_string();
    parse_hit_table(open_table(&path)?, &source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Cursor;

    /// Build a 10-column hit row.
    fn row(orf_id: &str, score: &str, product: &str) -> String {
        format!("{orf_id}\tq\t0\t{score}\t1e-10\t50\t100\t1\t100\t{product}\n")
    }

    #[rstest]
    #[case("contig_1_12", Some(("contig_1", "12")))]
    #[case("c1_1", Some(("c1", "1")))]
    #[case("_3", Some(("", "3")))]
    #[case("contig_", None)]
    #[case("contig_x1", None)]
    #[case("contig1", None)]
    fn test_split_orf_id(#[case] id: &str, #[case] expected: Option<(&str, &str)>) {
        assert_eq!(split_orf_id(id), expected);
    }

    #[rstest]
    #[case("hypothetical protein [Escherichia coli]", Some("Escherichia coli"))]
    #[case("a [b] c [d]", Some("b] c [d"))]
    #[case("no taxon here", None)]
    #[case("empty []", None)]
    #[case("reversed ] [", None)]
    fn test_extract_taxon(#[case] annotation: &str, #[case] expected: Option<&str>) {
        assert_eq!(extract_taxon(annotation), expected);
    }

    #[test]
    fn test_parse_hit_table_groups_by_contig_and_gene() {
        let mut input = String::from("# query\ttarget\tq\tbitscore\n");
        input.push_str(&row("c1_1", "50", "protein A [Bacteria]"));
        input.push_str(&row("c1_1", "30", "protein B [Bacteria]"));
        input.push_str(&row("c1_2", "40", "protein C [Archaea]"));
        input.push_str(&row("c2_5", "12", "protein D [Viruses]"));

        let set = parse_hit_table(Cursor::new(input), "hits").unwrap();
        assert_eq!(set.num_contigs(), 2);
        assert_eq!(set.num_genes(), 3);

        let gene = set.get("c1").unwrap().gene("1").unwrap();
        let scores: Vec<i64> = gene.hits.iter().map(|h| h.score).collect();
        assert_eq!(scores, vec![50, 30]);
        assert_eq!(gene.hits[0].taxon, "Bacteria");
    }

    #[test]
    fn test_parse_hit_table_skips_bad_ids_and_keeps_taxonless_genes() {
        let mut input = String::new();
        input.push_str(&row("nounderscore", "50", "x [Bacteria]"));
        input.push_str(&row("c1_3", "50", "no bracket"));
        input.push_str("\n");

        let set = parse_hit_table(Cursor::new(input), "hits").unwrap();
        assert_eq!(set.num_contigs(), 1);
        let gene = set.get("c1").unwrap().gene("3").unwrap();
        assert!(gene.hits.is_empty());
    }

    #[test]
    fn test_parse_hit_table_short_row_aborts() {
        let input = "c1_1\tq\t0\t50\t1e-10\t[Bacteria]\n";
        let err = parse_hit_table(Cursor::new(input), "hits").unwrap_err();
        assert!(matches!(
            err,
            LcaStarError::TooFewFields { line: 1, expected: 10, found: 6, .. }
        ));
    }

    #[test]
    fn test_parse_hit_table_bad_score_aborts() {
        let input = row("c1_1", "5O", "x [Bacteria]");
        let err = parse_hit_table(Cursor::new(input), "hits").unwrap_err();
        match err {
            LcaStarError::InvalidScore { value, line, .. } => {
                assert_eq!(value, "5O");
                assert_eq!(line, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
