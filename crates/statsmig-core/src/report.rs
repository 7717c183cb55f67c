//! Legacy-id report and console formatting helpers.

use crate::index::{FacetEntry, ReportCounts};
use crate::models::ObjectKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

const RULE: &str = "=================================================================";

/// Kinds that get their own report line.
const REPORTED_KINDS: [ObjectKind; 4] = [
    ObjectKind::Community,
    ObjectKind::Collection,
    ObjectKind::Item,
    ObjectKind::Bitstream,
];

/// One line of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportLine {
    pub label: String,
    pub count: u64,
}

/// Records still holding legacy ids, grouped by type and scope type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyReport {
    pub lines: Vec<ReportLine>,
    pub total: u64,
}

impl LegacyReport {
    pub fn from_counts(counts: &ReportCounts) -> Self {
        let mut lines = Vec::new();
        let mut total = 0;
        let mut unexpected = 0;

        let groups: [(&[FacetEntry], &str); 2] = [
            (&counts.type_facets, "View"),
            (&counts.scope_type_facets, "Search"),
        ];
        for (entries, facet_label) in groups {
            for entry in entries {
                let kind = entry
                    .value
                    .trim()
                    .parse::<i32>()
                    .ok()
                    .and_then(ObjectKind::from_type_code)
                    .filter(|kind| REPORTED_KINDS.contains(kind));
                match kind {
                    Some(kind) => {
                        lines.push(ReportLine {
                            label: format!("{} {}", kind.report_label(), facet_label),
                            count: entry.count,
                        });
                        total += entry.count;
                    }
                    None => unexpected += entry.count,
                }
            }
        }

        if unexpected > 0 {
            lines.push(ReportLine {
                label: "Unexpected Type & Full Site".to_string(),
                count: unexpected,
            });
            total += unexpected;
        }

        let remaining = counts.num_found.saturating_sub(total);
        if remaining > 0 {
            lines.push(ReportLine {
                label: "Other Records".to_string(),
                count: remaining,
            });
            total += remaining;
        }

        Self { lines, total }
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

impl fmt::Display for LegacyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "{}", RULE)?;
        writeln!(f, "\t*** Statistics Records with Legacy Id ***")?;
        writeln!(f)?;
        for line in &self.lines {
            writeln!(f, "\t{:>12}\t{}", format_count(line.count), line.label)?;
        }
        writeln!(f, "\t--------------------------------------")?;
        writeln!(f, "\t{:>12}\t{}", format_count(self.total), "TOTAL")?;
        writeln!(f, "{}", RULE)
    }
}

/// Format an integer with thousands separators.
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Format a duration as `h:mm:ss`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}
