//! DMARC aggregate report model (RFC 7489 Appendix C).
//!
//! Every textual field falls back to [`NOT_AVAILABLE`] when the element is missing and
//! every numeric field falls back to `0`, so a report from a sloppy reporter still loads.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};

use crate::xpath::{NodeExt, element_text};

/// Sentinel stored for absent textual fields
pub const NOT_AVAILABLE: &str = "NA";

/// A parsed aggregate report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub version: Option<String>,
    pub metadata: Metadata,
    pub policy: PolicyPublished,
    pub records: Vec<Record>,
}

/// `report_metadata` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub org_name: String,
    pub email: String,
    pub extra_contact_info: String,
    pub report_id: String,
    /// Start of the reporting window, seconds since the Unix epoch
    pub date_begin: u64,
    /// End of the reporting window, seconds since the Unix epoch
    pub date_end: u64,
    pub errors: Vec<String>,
}

/// `policy_published` section, echoed back verbatim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyPublished {
    pub domain: String,
    pub adkim: String,
    pub aspf: String,
    pub p: String,
    pub pct: String,
    pub fo: String,
    pub rf: String,
    pub ri: String,
    pub rua: String,
    pub ruf: String,
    pub v: String,
}

/// One `record` element: results for a single source IP
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub source_ip: String,
    pub count: u64,
    pub disposition: String,
    pub dkim: String,
    pub spf: String,
    #[serde(rename = "type")]
    pub reason_type: String,
    pub comment: String,
    pub header_from: String,
    pub envelope_from: String,
    pub dkim_domain: String,
    pub dkim_result: String,
    pub dkim_hresult: String,
    pub spf_domain: String,
    pub spf_result: String,
}

impl Report {
    /// Extract a report from a parsed document rooted at `<feedback>`
    pub fn from_document(doc: &Document<'_>) -> Self {
        let root = doc.root_element();

        let records: Vec<Record> = root
            .find_all("record")
            .into_iter()
            .map(Record::from_node)
            .collect();

        tracing::trace!(records = records.len(), "extracted report records");

        Report {
            version: root.find_text("version").map(Cow::into_owned),
            metadata: Metadata::from_node(root),
            policy: PolicyPublished::from_node(root),
            records,
        }
    }

    /// Total message count across all records
    pub fn message_count(&self) -> u64 {
        self.records.iter().map(|record| record.count).sum()
    }

    /// Logically inconsistent values that are accepted anyway
    ///
    /// Nothing here fails a parse; callers decide whether to act on it.
    pub fn inconsistencies(&self) -> Vec<String> {
        let mut findings = Vec::new();

        if self.metadata.date_end < self.metadata.date_begin {
            findings.push(format!(
                "date range ends before it begins ({} < {})",
                self.metadata.date_end, self.metadata.date_begin
            ));
        }

        if self.policy.pct != NOT_AVAILABLE {
            match self.policy.pct.trim().parse::<i64>() {
                Ok(pct) if (1..=100).contains(&pct) => {}
                Ok(pct) => findings.push(format!("pct {} is outside 1..=100", pct)),
                Err(_) => findings.push(format!("pct '{}' is not a number", self.policy.pct)),
            }
        }

        findings
    }
}

impl Metadata {
    fn from_node(root: Node<'_, '_>) -> Self {
        Metadata {
            org_name: root.text_or_default("report_metadata/org_name", NOT_AVAILABLE),
            email: root.text_or_default("report_metadata/email", NOT_AVAILABLE),
            extra_contact_info: root
                .text_or_default("report_metadata/extra_contact_info", NOT_AVAILABLE),
            report_id: root.text_or_default("report_metadata/report_id", NOT_AVAILABLE),
            date_begin: root.integer_or_default("report_metadata/date_range/begin", 0),
            date_end: root.integer_or_default("report_metadata/date_range/end", 0),
            errors: root
                .find_all("report_metadata/error")
                .iter()
                .map(|node| element_text(*node).into_owned())
                .collect(),
        }
    }

    pub fn date_begin_utc(&self) -> Option<DateTime<Utc>> {
        timestamp_to_utc(self.date_begin)
    }

    pub fn date_end_utc(&self) -> Option<DateTime<Utc>> {
        timestamp_to_utc(self.date_end)
    }

    /// Errors rendered as one column value: `a | b`, or `NA` when there are none
    pub fn joined_errors(&self) -> String {
        if self.errors.is_empty() {
            NOT_AVAILABLE.to_string()
        } else {
            self.errors.join(" | ")
        }
    }
}

fn timestamp_to_utc(secs: u64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(i64::try_from(secs).ok()?, 0)
}

impl PolicyPublished {
    fn from_node(root: Node<'_, '_>) -> Self {
        let field = |name: &str| {
            root.text_or_default(&format!("policy_published/{}", name), NOT_AVAILABLE)
        };

        PolicyPublished {
            domain: field("domain"),
            adkim: field("adkim"),
            aspf: field("aspf"),
            p: field("p"),
            pct: field("pct"),
            fo: field("fo"),
            rf: field("rf"),
            ri: field("ri"),
            rua: field("rua"),
            ruf: field("ruf"),
            v: field("v"),
        }
    }
}

impl Record {
    fn from_node(record: Node<'_, '_>) -> Self {
        let text = |path: &str| record.text_or_default(path, NOT_AVAILABLE);

        Record {
            source_ip: text("row/source_ip"),
            count: record.integer_or_default("row/count", 0),
            disposition: text("row/policy_evaluated/disposition"),
            dkim: text("row/policy_evaluated/dkim"),
            spf: text("row/policy_evaluated/spf"),
            reason_type: text("row/policy_evaluated/reason/type"),
            comment: text("row/policy_evaluated/reason/comment"),
            header_from: text("identifiers/header_from"),
            envelope_from: text("identifiers/envelope_from"),
            dkim_domain: text("auth_results/dkim/domain"),
            dkim_result: text("auth_results/dkim/result"),
            dkim_hresult: text("auth_results/dkim/human_result"),
            spf_domain: text("auth_results/spf/domain"),
            spf_result: text("auth_results/spf/result"),
        }
    }
}
