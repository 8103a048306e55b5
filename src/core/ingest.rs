//! Tabular contact ingestion
//!
//! Turns loosely structured delimited text (spreadsheet exports, mail client
//! address dumps, hand-edited CSV) into contact drafts plus a skip report.
//! Nothing in here fails the batch: every problem is attributed to the row
//! it came from.

use crate::models::{ContactDraft, ContactStatus, MemberType, SkipRecord};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

pub const REASON_NO_EMAIL: &str = "No email address";
pub const REASON_DUPLICATE: &str = "Duplicate email address";
pub const REASON_UNTERMINATED: &str = "Malformed row: unterminated quoted field";
pub const REASON_BAD_HEADER: &str = "Malformed header row";

const EMAIL_ALIASES: &[&str] = &["email", "e-mail", "email address"];
const FIRST_NAME_ALIASES: &[&str] = &["first name", "firstname", "first", "given name"];
const LAST_NAME_ALIASES: &[&str] = &["last name", "lastname", "last", "surname", "family name"];
const FULL_NAME_ALIASES: &[&str] = &["name", "full name", "fullname"];
const MEMBER_TYPE_ALIASES: &[&str] = &["member type", "membertype", "type"];
const STATUS_ALIASES: &[&str] = &["status", "subscription status"];

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}").expect("valid email pattern")
});

static ANGLE_BRACKETS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<([^<>]*)>").expect("valid angle bracket pattern"));

/// A draft together with the source line it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedContact {
    pub row: usize,
    pub draft: ContactDraft,
}

/// Output of [`parse_contacts`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOutput {
    pub contacts: Vec<ParsedContact>,
    pub skipped: Vec<SkipRecord>,
}

impl ParseOutput {
    pub fn drafts(&self) -> impl Iterator<Item = &ContactDraft> {
        self.contacts.iter().map(|c| &c.draft)
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty() && self.skipped.is_empty()
    }
}

/// Tokenizer failure for a single line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    UnterminatedQuote,
}

/// Split one line into fields
///
/// A `"` toggles quoted mode, `""` inside quotes is a literal quote and a
/// comma inside quotes is data. Fields are trimmed.
pub fn split_fields(line: &str) -> Result<Vec<String>, LineError> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }

    if in_quotes {
        return Err(LineError::UnterminatedQuote);
    }
    fields.push(current.trim().to_string());
    Ok(fields)
}

/// Pull an email address out of a free-form field
///
/// Returns an empty string when nothing usable is found.
pub fn extract_email(raw: &str) -> String {
    if let Some(caps) = ANGLE_BRACKETS.captures(raw) {
        let inner = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
        if !inner.is_empty() {
            return inner.to_string();
        }
    }

    if raw.contains(',') {
        let token = raw
            .split(',')
            .map(str::trim)
            .find(|t| t.contains('@') && !t.contains('<') && !t.contains('>'));
        if let Some(token) = token {
            return token.to_string();
        }
    }

    if let Some(m) = EMAIL_PATTERN.find(raw) {
        return m.as_str().to_string();
    }

    let trimmed = raw.trim();
    if trimmed.contains('@') {
        return trimmed.to_string();
    }

    String::new()
}

/// Split a combined name column into (first, last)
///
/// `"Last, First"` is honoured; otherwise the first word is the first name
/// and the remainder the last name.
pub fn split_full_name(raw: &str) -> (String, String) {
    let name = raw.trim();
    if let Some((last, first)) = name.split_once(',') {
        return (first.trim().to_string(), last.trim().to_string());
    }
    match name.split_once(char::is_whitespace) {
        Some((first, rest)) => (first.to_string(), rest.trim().to_string()),
        None => (name.to_string(), String::new()),
    }
}

#[derive(Debug, Default)]
struct ColumnMap {
    email: Option<usize>,
    first_name: Option<usize>,
    last_name: Option<usize>,
    full_name: Option<usize>,
    member_type: Option<usize>,
    status: Option<usize>,
}

impl ColumnMap {
    fn from_header(header: &[String]) -> Self {
        let names: Vec<String> = header.iter().map(|h| canonical_header(h)).collect();
        let find = |aliases: &[&str]| names.iter().position(|n| aliases.contains(&n.as_str()));

        let first_name = find(FIRST_NAME_ALIASES);
        let last_name = find(LAST_NAME_ALIASES);
        let full_name = if first_name.is_none() && last_name.is_none() {
            find(FULL_NAME_ALIASES)
        } else {
            None
        };

        Self {
            email: find(EMAIL_ALIASES),
            first_name,
            last_name,
            full_name,
            member_type: find(MEMBER_TYPE_ALIASES),
            status: find(STATUS_ALIASES),
        }
    }
}

fn canonical_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}')
        .trim()
        .to_lowercase()
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn cell(fields: &[String], index: Option<usize>) -> &str {
    index
        .and_then(|i| fields.get(i))
        .map(String::as_str)
        .unwrap_or_default()
}

fn draft_from_fields(fields: &[String], columns: &ColumnMap) -> Option<ContactDraft> {
    let email = match columns.email {
        Some(i) => extract_email(cell(fields, Some(i))),
        None => fields
            .iter()
            .map(|f| extract_email(f))
            .find(|e| !e.is_empty())
            .unwrap_or_default(),
    };
    if email.is_empty() {
        return None;
    }

    let (first_name, last_name) = match columns.full_name {
        Some(i) => split_full_name(cell(fields, Some(i))),
        None => (
            cell(fields, columns.first_name).to_string(),
            cell(fields, columns.last_name).to_string(),
        ),
    };

    let member_type = MemberType::parse_loose(cell(fields, columns.member_type)).unwrap_or_default();
    let status = ContactStatus::parse_loose(cell(fields, columns.status)).unwrap_or_default();

    Some(ContactDraft {
        email,
        first_name,
        last_name,
        member_type,
        status,
    })
}

/// Parse raw tabular text into contact drafts
///
/// The first non-blank line is the header. Blank lines are ignored. Row
/// numbers in the output are 1-based source line numbers.
pub fn parse_contacts(raw: &str) -> ParseOutput {
    let mut output = ParseOutput::default();

    let mut lines = raw
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .enumerate()
        .map(|(i, l)| (i + 1, l))
        .filter(|(_, l)| !l.trim().is_empty());

    let Some((_, header_line)) = lines.next() else {
        return output;
    };

    let columns = match split_fields(header_line) {
        Ok(header) => Some(ColumnMap::from_header(&header)),
        Err(_) => None,
    };

    let mut seen_emails = HashSet::new();

    for (row, line) in lines {
        let Some(columns) = columns.as_ref() else {
            output.skipped.push(SkipRecord::new(row, REASON_BAD_HEADER));
            continue;
        };

        let fields = match split_fields(line) {
            Ok(fields) => fields,
            Err(LineError::UnterminatedQuote) => {
                output.skipped.push(SkipRecord::new(row, REASON_UNTERMINATED));
                continue;
            }
        };

        match draft_from_fields(&fields, columns) {
            None => output.skipped.push(SkipRecord::new(row, REASON_NO_EMAIL)),
            Some(draft) => {
                if !seen_emails.insert(draft.email.to_lowercase()) {
                    output.skipped.push(SkipRecord::new(row, REASON_DUPLICATE));
                    continue;
                }
                output.contacts.push(ParsedContact { row, draft });
            }
        }
    }

    tracing::debug!(
        "Parsed {} contacts ({} rows skipped)",
        output.contacts.len(),
        output.skipped.len()
    );

    output
}
