//! Defensive rendering of the analysis document attached to each result.
//!
//! The document is produced upstream by a language model and stored as text.
//! Any section, and any field within a section, may be missing, null, empty
//! or of the wrong type. Extraction resolves each field on its own, so one bad
//! field never hides its neighbours. Only a document that cannot be
//! deserialized at all is reported as a format problem, and even that ends in
//! a placeholder rather than an error.

use std::fmt;

use serde_json::{Map, Value};

pub const NOT_AVAILABLE: &str = "N/A";
pub const NONE: &str = "None";
pub const NO_ENTRIES: &str = "No entries found.";
pub const NO_ANALYSIS: &str = "No analysis available.";
pub const INVALID_FORMAT: &str = "Invalid analysis format";
pub const UNKNOWN_COMPANY: &str = "Unknown Company";

const TITLE_WORDS: usize = 6;

// ── Source keys ──

const KEY_SUMMARY: &str = "SUMMARY";
const KEY_FINANCIALS: &str = "FINANCIALS";
const KEY_ACTUALS: &str = "Actuals";
const KEY_ESTIMATES: &str = "Estimates";
const KEY_THESIS: &str = "THESIS";
const KEY_RED_FLAGS: &str = "RED FLAGS";
const KEY_CONFIDENCE: &str = "confidence_score";
const KEY_FLAGGED: &str = "flagged_fields";
const KEY_LOW_CONFIDENCE: &str = "low_confidence_flags";
const KEY_COMPANY: &str = "COMPANY INFO";

/// (label, source key) pairs for the two financial groups, in display order.
const ACTUAL_FIELDS: &[(&str, &str)] = &[
    ("Revenue", "revenue"),
    ("EBITDA", "EBITDA"),
    ("Year", "year"),
    ("Margin", "margin"),
    ("FCF", "FCF"),
];

const ESTIMATE_FIELDS: &[(&str, &str)] = &[
    ("Forward Revenue", "forward revenue"),
    ("EBITDA", "EBITDA"),
    ("Capex", "capex"),
    ("Capex/Revenue", "capex/revenue"),
];

// ── Schema ──

/// The analysis document with every section optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryDocument {
    pub summary: Option<String>,
    pub actuals: Vec<(&'static str, Option<String>)>,
    pub estimates: Vec<(&'static str, Option<String>)>,
    pub thesis: Option<Vec<String>>,
    pub red_flags: Option<Vec<String>>,
    pub confidence: Option<f64>,
    pub flagged_fields: Option<Vec<String>>,
    pub low_confidence_notes: Option<String>,
    pub company_name: Option<String>,
    pub company_description: Option<String>,
}

/// Outcome of reading the raw `summary_json` value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedSummary {
    Absent,
    Malformed,
    Document(SummaryDocument),
}

impl SummaryDocument {
    /// Read a raw document value.
    ///
    /// Null and empty text are `Absent`. Text that is not JSON, or JSON that
    /// is not an object, is `Malformed`.
    pub fn parse(raw: Option<&Value>) -> ParsedSummary {
        let object = match raw {
            None | Some(Value::Null) => return ParsedSummary::Absent,
            Some(Value::String(text)) if text.trim().is_empty() => return ParsedSummary::Absent,
            Some(Value::String(text)) => match serde_json::from_str::<Value>(text) {
                Ok(Value::Object(map)) => map,
                Ok(other) => {
                    tracing::debug!(kind = json_kind(&other), "analysis text is not an object");
                    return ParsedSummary::Malformed;
                }
                Err(e) => {
                    tracing::debug!(error = %e, "analysis text failed to deserialize");
                    return ParsedSummary::Malformed;
                }
            },
            Some(Value::Object(map)) => map.clone(),
            Some(_) => return ParsedSummary::Malformed,
        };
        ParsedSummary::Document(Self::from_object(&object))
    }

    fn from_object(doc: &Map<String, Value>) -> Self {
        let financials = doc.get(KEY_FINANCIALS).and_then(Value::as_object);
        let group = |key: &str| financials.and_then(|f| f.get(key)).and_then(Value::as_object);
        let actuals = group(KEY_ACTUALS);
        let estimates = group(KEY_ESTIMATES);
        let company = doc.get(KEY_COMPANY).and_then(Value::as_object);

        Self {
            summary: doc.get(KEY_SUMMARY).and_then(scalar_text),
            actuals: resolve_fields(actuals, ACTUAL_FIELDS),
            estimates: resolve_fields(estimates, ESTIMATE_FIELDS),
            thesis: doc.get(KEY_THESIS).and_then(string_list),
            red_flags: doc.get(KEY_RED_FLAGS).and_then(string_list),
            confidence: doc.get(KEY_CONFIDENCE).and_then(number),
            flagged_fields: doc.get(KEY_FLAGGED).and_then(string_list),
            low_confidence_notes: doc.get(KEY_LOW_CONFIDENCE).and_then(scalar_text),
            company_name: company.and_then(|c| c.get("Name")).and_then(scalar_text),
            company_description: company
                .and_then(|c| c.get("Description"))
                .and_then(scalar_text),
        }
    }
}

// ── Rendered view ──

/// A list section after placeholder substitution.
#[derive(Debug, Clone, PartialEq)]
pub enum Entries {
    Items(Vec<String>),
    Placeholder,
}

impl Entries {
    fn from_list(list: Option<Vec<String>>) -> Self {
        match list {
            Some(items) if !items.is_empty() => Entries::Items(items),
            _ => Entries::Placeholder,
        }
    }

    /// One display line per entry, or the single placeholder line.
    pub fn lines(&self) -> Vec<&str> {
        match self {
            Entries::Items(items) => items.iter().map(String::as_str).collect(),
            Entries::Placeholder => vec![NO_ENTRIES],
        }
    }
}

/// Display-ready sections. Every string is already resolved to a value or
/// its fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSections {
    pub executive_summary: String,
    pub actuals: Vec<(&'static str, String)>,
    pub estimates: Vec<(&'static str, String)>,
    pub thesis: Entries,
    pub red_flags: Entries,
    pub confidence: String,
    pub flagged_fields: String,
    pub low_confidence_notes: String,
}

/// What the detail view shows for a document.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisView {
    Unavailable,
    InvalidFormat,
    Sections(AnalysisSections),
}

/// Render a raw `summary_json` value. Never fails.
pub fn render(raw: Option<&Value>) -> AnalysisView {
    match SummaryDocument::parse(raw) {
        ParsedSummary::Absent => AnalysisView::Unavailable,
        ParsedSummary::Malformed => AnalysisView::InvalidFormat,
        ParsedSummary::Document(doc) => AnalysisView::Sections(AnalysisSections::from(doc)),
    }
}

impl From<SummaryDocument> for AnalysisSections {
    fn from(doc: SummaryDocument) -> Self {
        let or_na = |v: Option<String>| v.unwrap_or_else(|| NOT_AVAILABLE.to_string());
        let fields = |group: Vec<(&'static str, Option<String>)>| -> Vec<(&'static str, String)> {
            group.into_iter().map(|(label, v)| (label, or_na(v))).collect()
        };

        // No edit affordance here, so absent confidence is N/A rather than
        // the dashboard slider default.
        let confidence = doc
            .confidence
            .filter(|c| c.is_finite())
            .map(|c| format!("{}%", (c * 100.0).round() as i64))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());

        let flagged_fields = match doc.flagged_fields {
            Some(names) if !names.is_empty() => names.join(", "),
            _ => NONE.to_string(),
        };

        Self {
            executive_summary: or_na(doc.summary),
            actuals: fields(doc.actuals),
            estimates: fields(doc.estimates),
            thesis: Entries::from_list(doc.thesis),
            red_flags: Entries::from_list(doc.red_flags),
            confidence,
            flagged_fields,
            low_confidence_notes: doc.low_confidence_notes.unwrap_or_else(|| NONE.to_string()),
        }
    }
}

impl fmt::Display for AnalysisView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AnalysisView::Unavailable => return writeln!(f, "{NO_ANALYSIS}"),
            AnalysisView::InvalidFormat => return writeln!(f, "{INVALID_FORMAT}"),
            AnalysisView::Sections(s) => s,
        };

        writeln!(f, "Executive Summary")?;
        writeln!(f, "  {}", s.executive_summary)?;
        writeln!(f)?;

        writeln!(f, "Key Financials")?;
        writeln!(f, "  Actuals:")?;
        for (label, value) in &s.actuals {
            writeln!(f, "    {:<18} {}", format!("{label}:"), value)?;
        }
        writeln!(f, "  Estimates:")?;
        for (label, value) in &s.estimates {
            writeln!(f, "    {:<18} {}", format!("{label}:"), value)?;
        }
        writeln!(f)?;

        writeln!(f, "Investment Thesis")?;
        for line in s.thesis.lines() {
            writeln!(f, "  - {line}")?;
        }
        writeln!(f)?;

        writeln!(f, "Red Flags")?;
        for line in s.red_flags.lines() {
            writeln!(f, "  - {line}")?;
        }
        writeln!(f)?;

        writeln!(f, "Confidence & Flags")?;
        writeln!(f, "  Confidence Score:     {}", s.confidence)?;
        writeln!(f, "  Flagged Fields:       {}", s.flagged_fields)?;
        writeln!(f, "  Low Confidence Notes: {}", s.low_confidence_notes)
    }
}

// ── Card title ──

/// One-line dashboard title: company name plus the first words of its
/// description. Falls back to `filename` when the document is unusable.
pub fn card_title(raw: Option<&Value>, filename: &str) -> String {
    let doc = match SummaryDocument::parse(raw) {
        ParsedSummary::Document(doc) => doc,
        ParsedSummary::Absent | ParsedSummary::Malformed => return filename.to_string(),
    };
    let name = doc.company_name.as_deref().unwrap_or(UNKNOWN_COMPANY);
    let words: Vec<&str> = doc
        .company_description
        .as_deref()
        .unwrap_or_default()
        .split_whitespace()
        .collect();
    if words.is_empty() {
        return name.to_string();
    }
    let mut subtitle = words[..words.len().min(TITLE_WORDS)].join(" ");
    if words.len() > TITLE_WORDS {
        subtitle.push_str("...");
    }
    format!("{name} – {subtitle}")
}

// ── Field helpers ──

fn resolve_fields(
    group: Option<&Map<String, Value>>,
    fields: &[(&'static str, &str)],
) -> Vec<(&'static str, Option<String>)> {
    fields
        .iter()
        .map(|&(label, key)| (label, group.and_then(|g| g.get(key)).and_then(scalar_text)))
        .collect()
}

/// Non-empty string or a number in its JSON form. Anything else is absent.
fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A JSON array reduced to its scalar entries. Non-arrays are absent.
fn string_list(v: &Value) -> Option<Vec<String>> {
    let items = v.as_array()?;
    Some(items.iter().filter_map(scalar_text).collect())
}

fn number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
