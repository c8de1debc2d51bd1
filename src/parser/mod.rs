//! Splits model output into the sections of a [`StructuredResult`].
//!
//! The scanner is a small state machine: the state is the section currently
//! being filled (or none before the first header) and the only transition
//! is a header line.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::error::ParseError;
use crate::models::{StructuredResult, SuggestedRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Role,
    Objective,
    Constraints,
    OutputFormat,
    ToneStyle,
    KeywordStrategy,
    EeatRequirements,
    ContentStructure,
    Context,
    Stakeholders,
    SuccessCriteria,
    SuggestedRole,
}

/// Sections folded into `constraints`, in output order.
const CONSTRAINT_SECTIONS: [Section; 8] = [
    Section::Constraints,
    Section::ToneStyle,
    Section::KeywordStrategy,
    Section::EeatRequirements,
    Section::ContentStructure,
    Section::Context,
    Section::Stakeholders,
    Section::SuccessCriteria,
];

impl Section {
    fn from_label(label: &str) -> Option<Self> {
        let normalized: String = label.chars().filter(|c| !c.is_whitespace()).collect();
        match normalized.to_uppercase().as_str() {
            "ROLE" => Some(Section::Role),
            "OBJECTIVE" => Some(Section::Objective),
            "CONSTRAINTS" | "CONSTRAINT" => Some(Section::Constraints),
            "OUTPUTFORMAT" => Some(Section::OutputFormat),
            "TONE&STYLE" => Some(Section::ToneStyle),
            "KEYWORDSTRATEGY" => Some(Section::KeywordStrategy),
            "EEATREQUIREMENTS" => Some(Section::EeatRequirements),
            "CONTENTSTRUCTURE" => Some(Section::ContentStructure),
            "CONTEXT" => Some(Section::Context),
            "STAKEHOLDERS" => Some(Section::Stakeholders),
            "SUCCESSCRITERIA" => Some(Section::SuccessCriteria),
            "SUGGESTED_ROLE" => Some(Section::SuggestedRole),
            _ => None,
        }
    }
}

static HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(?:#{1,6}\s*)?\**\s*(ROLE|OBJECTIVE|CONSTRAINTS?|OUTPUT\s+FORMAT|TONE\s*&\s*STYLE|KEYWORD\s+STRATEGY|EEAT\s+REQUIREMENTS|CONTENT\s+STRUCTURE|CONTEXT|STAKEHOLDERS|SUCCESS\s+CRITERIA|SUGGESTED_ROLE)\s*\**\s*(?::\s*\**\s*(.*?))?\s*$",
    )
    .expect("header pattern is valid")
});

static SUGGESTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)name:\s*"([^"]+)"\s*\|\s*category:\s*(\w+)\s*\|\s*confidence:\s*([0-9]*\.?[0-9]+)\s*\|\s*reason:\s*(.+?)\s*$"#,
    )
    .expect("suggestion pattern is valid")
});

/// A header line: the section it opens plus any text after the colon.
/// Only SUGGESTED_ROLE may carry text on its header line; for every other
/// label such a line is ordinary content.
fn match_header(line: &str) -> Option<(Section, Option<&str>)> {
    let caps = HEADER.captures(line)?;
    let section = Section::from_label(caps.get(1)?.as_str())?;
    let inline = caps
        .get(2)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty());
    if inline.is_some() && section != Section::SuggestedRole {
        return None;
    }
    Some((section, inline))
}

/// Lines without their terminators, each with its byte offset in `raw`.
fn split_lines(raw: &str) -> Vec<(usize, &str)> {
    let mut offset = 0;
    raw.split_inclusive('\n')
        .map(|chunk| {
            let start = offset;
            offset += chunk.len();
            (start, chunk.trim_end_matches(|c| c == '\n' || c == '\r'))
        })
        .collect()
}

#[derive(Default)]
struct Scan {
    sections: Vec<(Section, Vec<String>)>,
    /// Line ranges `[start, end)` covered by SUGGESTED_ROLE blocks.
    suggestion_spans: Vec<(usize, usize)>,
}

impl Scan {
    fn lines(&self, section: Section) -> impl Iterator<Item = &String> {
        self.sections
            .iter()
            .filter(move |(s, _)| *s == section)
            .flat_map(|(_, lines)| lines.iter())
    }

    fn joined(&self, section: Section, sep: &str) -> String {
        self.lines(section).cloned().collect::<Vec<_>>().join(sep)
    }

    fn has(&self, section: Section) -> bool {
        self.sections.iter().any(|(s, _)| *s == section)
    }
}

fn scan(lines: &[&str]) -> Scan {
    let mut scan = Scan::default();
    let mut current: Option<Section> = None;
    let mut open_suggestion: Option<usize> = None;

    for (idx, line) in lines.iter().enumerate() {
        if let Some((section, inline)) = match_header(line) {
            debug!("Section {:?} starts at line {}", section, idx + 1);
            if let Some(start) = open_suggestion.take() {
                scan.suggestion_spans.push((start, idx));
            }
            if section == Section::SuggestedRole {
                open_suggestion = Some(idx);
            }
            current = Some(section);
            scan.sections.push((section, Vec::new()));
            if let (Some(text), Some((_, acc))) = (inline, scan.sections.last_mut()) {
                acc.push(text.to_string());
            }
            continue;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() || current.is_none() {
            continue;
        }
        if let Some((_, acc)) = scan.sections.last_mut() {
            acc.push(trimmed.to_string());
        }
    }

    if let Some(start) = open_suggestion {
        scan.suggestion_spans.push((start, lines.len()));
    }
    scan
}

fn parse_suggestion(text: &str) -> Result<SuggestedRole, ParseError> {
    let caps = SUGGESTION
        .captures(text.trim())
        .ok_or(ParseError::SuggestionLayout)?;
    let field = |i: usize| caps.get(i).map(|m| m.as_str().trim()).unwrap_or_default();

    let confidence: f64 = field(3)
        .parse()
        .map_err(|_| ParseError::Confidence(field(3).to_string()))?;
    if !(0.0..=1.0).contains(&confidence) {
        return Err(ParseError::Confidence(field(3).to_string()));
    }

    Ok(SuggestedRole {
        name: field(1).to_string(),
        category: field(2).to_lowercase(),
        confidence,
        reason: field(4).to_string(),
    })
}

/// Cuts the line ranges out of `raw` by byte offset, so the remaining text
/// keeps its original line endings.
fn strip_spans(raw: &str, lines: &[(usize, &str)], spans: &[(usize, usize)]) -> String {
    let offset = |idx: usize| lines.get(idx).map(|(start, _)| *start).unwrap_or(raw.len());
    let mut kept = String::with_capacity(raw.len());
    let mut cursor = 0;
    for &(start, end) in spans {
        kept.push_str(&raw[cursor..offset(start)]);
        cursor = offset(end);
    }
    kept.push_str(&raw[cursor..]);
    kept.trim_end().to_string()
}

/// Parses raw model output. Never fails: missing sections stay empty and a
/// malformed suggestion is dropped.
pub fn parse(raw: &str) -> StructuredResult {
    let lines = split_lines(raw);
    let text: Vec<&str> = lines.iter().map(|(_, line)| *line).collect();
    let scan = scan(&text);

    let constraints = CONSTRAINT_SECTIONS
        .iter()
        .flat_map(|section| scan.lines(*section).cloned())
        .collect();

    let suggested_role = if scan.has(Section::SuggestedRole) {
        match parse_suggestion(&scan.joined(Section::SuggestedRole, " ")) {
            Ok(suggestion) => Some(suggestion),
            Err(e) => {
                debug!("Ignoring suggested role: {}", e);
                None
            }
        }
    } else {
        None
    };

    let full_text = if scan.suggestion_spans.is_empty() {
        raw.to_string()
    } else {
        strip_spans(raw, &lines, &scan.suggestion_spans)
    };

    StructuredResult {
        role: scan.joined(Section::Role, " "),
        objective: scan.joined(Section::Objective, " "),
        constraints,
        output_format: scan.joined(Section::OutputFormat, "\n"),
        full_text,
        suggested_role,
    }
}
