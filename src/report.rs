//src/report.rs

use ahash::AHashMap;
use std::fmt::Write as FmtWrite;
use std::io::{self, BufRead, Write};

use crate::error::{LcaStarError, Result};
use crate::resolver::TaxonomyResolver;
use crate::tables::{display_taxon, preferred_name, MappingTable, NamePreferences};
use crate::types::{ContigReport, Estimator};

/// One output column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Contig,
    Taxon(Estimator),
    Confidence(Estimator),
    Distance(Estimator),
    WeightedDistance(Estimator),
    Original,
}

use Column::*;
use Estimator::{LcaSquared, LcaStar, Majority};

const MINIMAL: &[Column] = &[Contig, Taxon(LcaStar), Confidence(LcaStar)];

const MINIMAL_WITH_REFERENCE: &[Column] = &[
    Contig,
    Taxon(LcaStar),
    Confidence(LcaStar),
    Distance(LcaStar),
    WeightedDistance(LcaStar),
    Original,
];

const ALL_METHODS: &[Column] = &[
    Contig,
    Taxon(LcaStar),
    Confidence(LcaStar),
    Taxon(Majority),
    Confidence(Majority),
    Taxon(LcaSquared),
];

const ALL_METHODS_WITH_REFERENCE: &[Column] = &[
    Contig,
    Taxon(LcaStar),
    Confidence(LcaStar),
    Distance(LcaStar),
    WeightedDistance(LcaStar),
    Taxon(Majority),
    Confidence(Majority),
    Distance(Majority),
    WeightedDistance(Majority),
    Taxon(LcaSquared),
    Distance(LcaSquared),
    WeightedDistance(LcaSquared),
    Original,
];

fn column_prefix(estimator: Estimator) -> &'static str {
    match estimator {
        LcaStar => "LCAStar",
        Majority => "Majority",
        LcaSquared => "LCASquared",
    }
}

fn render_opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

impl Column {
    pub fn name(&self) -> String {
        match self {
            Contig => "Contig".to_string(),
            Original => "Original".to_string(),
            Taxon(e) => column_prefix(*e).to_string(),
            Confidence(e) => format!("{}_p", column_prefix(*e)),
            Distance(e) => format!("{}_dist", column_prefix(*e)),
            WeightedDistance(e) => format!("{}_WTD", column_prefix(*e)),
        }
    }

    /// Cell value for `report`; missing values are empty.
    pub fn render(&self, report: &ContigReport) -> String {
        match self {
            Contig => report.contig.clone(),
            Original => report.reference.clone().unwrap_or_default(),
            Taxon(e) => report
                .estimate(*e)
                .map(|est| est.taxon.clone())
                .unwrap_or_default(),
            Confidence(e) => render_opt(report.estimate(*e).and_then(|est| est.confidence)),
            Distance(e) => render_opt(report.estimate(*e).and_then(|est| est.distance)),
            WeightedDistance(e) => {
                render_opt(report.estimate(*e).and_then(|est| est.weighted_distance))
            }
        }
    }
}

/// The four fixed column sets, chosen by two independent switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportLayout {
    Minimal,
    MinimalWithReference,
    AllMethods,
    AllMethodsWithReference,
}

impl ReportLayout {
    pub fn new(all_methods: bool, has_reference: bool) -> Self {
        match (all_methods, has_reference) {
            (false, false) => ReportLayout::Minimal,
            (false, true) => ReportLayout::MinimalWithReference,
            (true, false) => ReportLayout::AllMethods,
            (true, true) => ReportLayout::AllMethodsWithReference,
        }
    }

    pub fn columns(&self) -> &'static [Column] {
        match self {
            ReportLayout::Minimal => MINIMAL,
            ReportLayout::MinimalWithReference => MINIMAL_WITH_REFERENCE,
            ReportLayout::AllMethods => ALL_METHODS,
            ReportLayout::AllMethodsWithReference => ALL_METHODS_WITH_REFERENCE,
        }
    }

    pub fn header(&self) -> String {
        self.columns()
            .iter()
            .map(Column::name)
            .collect::<Vec<_>>()
            .join("\t")
    }

    pub fn row(&self, report: &ContigReport) -> String {
        self.columns()
            .iter()
            .map(|c| c.render(report))
            .collect::<Vec<_>>()
            .join("\t")
    }
}

/// Header plus one line per report, in the given order.
pub fn render_report(layout: ReportLayout, reports: &[ContigReport]) -> String {
    let mut output = String::new();
    output.push_str(&layout.header());
    output.push('\n');
    for report in reports {
        let _ = writeln!(output, "{}", layout.row(report));
    }
    output
}

pub fn write_report<W: Write>(
    out: &mut W,
    layout: ReportLayout,
    reports: &[ContigReport],
) -> io::Result<()> {
    writeln!(out, "{}", layout.header())?;
    for report in reports {
        writeln!(out, "{}", layout.row(report))?;
    }
    out.flush()
}

pub const LONG_REPORT_HEADER: &str = "contig\torigin\treal\ttaxa\tmethod\tdist\twtd\treal_lineage";

/// Long format: one row per contig and estimator, with taxa shown through the
/// preferred-name table and the reference lineage spelled out root first.
pub fn render_long_report(
    reports: &[ContigReport],
    mapping: &MappingTable,
    preferences: &NamePreferences,
    resolver: &dyn TaxonomyResolver,
) -> String {
    let mut output = String::new();
    output.push_str(LONG_REPORT_HEADER);
    output.push('\n');

    for report in reports {
        let origin = mapping.get(&report.contig).map(String::as_str).unwrap_or("");
        let real = report.reference.as_deref().unwrap_or("");
        let real_lineage = match report.reference.as_deref() {
            Some(reference) => resolver
                .lineage_ids(reference)
                .iter()
                .rev()
                .map(|id| preferred_name(id, preferences, resolver))
                .collect::<Vec<_>>()
                .join(";"),
            None => String::new(),
        };

        for estimator in Estimator::ALL {
            let Some(est) = report.estimate(estimator) else {
                continue;
            };
            let _ = writeln!(
                output,
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                report.contig,
                origin,
                real,
                display_taxon(&est.taxon, preferences, resolver),
                estimator.method_name(),
                render_opt(est.distance),
                render_opt(est.weighted_distance),
                real_lineage
            );
        }
    }
    output
}

/// Read a written report back as column-name -> value records.
pub fn read_report<R: BufRead>(reader: R, source: &str) -> Result<Vec<AHashMap<String, String>>> {
    let mut lines = reader.lines();
    let header: Vec<String> = match lines.next() {
        Some(line) => line
            .map_err(|e| LcaStarError::io(source, e))?
            .split('\t')
            .map(str::to_string)
            .collect(),
        None => return Ok(Vec::new()),
    };

    let mut records = Vec::new();
    for (idx, line_result) in lines.enumerate() {
        let line = line_result.map_err(|e| LcaStarError::io(source, e))?;
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != header.len() {
            return Err(LcaStarError::ColumnMismatch {
                path: source.to_string(),
                line: idx + 2,
                expected: header.len(),
                found: fields.len(),
            });
        }
        records.push(
            header
                .iter()
                .cloned()
                .zip(fields.iter().map(|f| f.to_string()))
                .collect(),
        );
    }
    Ok(records)
}
