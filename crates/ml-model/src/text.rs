//! Text cleaning and the `label,text` dataset format shared by training and inference.

use ml_types::ModelError;
use regex::Regex;
use std::sync::OnceLock;

/// Header of every cleaned dataset.
pub const DATASET_HEADER: &str = "label,text";

const STOP_WORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "an", "and", "any", "are", "as", "at", "be", "been",
    "but", "by", "can", "could", "did", "do", "does", "for", "from", "had", "has", "have", "he",
    "her", "his", "i", "if", "in", "into", "is", "it", "its", "me", "more", "my", "no", "not",
    "of", "on", "or", "our", "out", "over", "she", "so", "than", "that", "the", "their", "them",
    "then", "there", "these", "they", "this", "to", "up", "was", "we", "were", "what", "when",
    "which", "who", "will", "with", "would", "you", "your",
];

const NOISE_WORDS: &[&str] = &["href", "lt", "gt", "ii", "iii", "ie", "quot", "com"];

/// One labelled example.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledRecord {
    pub label: String,
    pub text: String,
}

/// Splits one CSV line into fields. Handles double-quoted fields with `""` escapes; quoted
/// fields may not span lines.
pub fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.is_empty() => in_quotes = true,
            ',' if !in_quotes => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}

fn markup_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<.*?>").expect("markup pattern is valid"))
}

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"https?://\S+|www\.\S+").expect("url pattern is valid"))
}

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[\w']+").expect("token pattern is valid"))
}

/// Normalizes raw text into space-separated lowercase tokens: closed markup tags and URLs
/// removed, stop words, numbers and punctuation dropped. Output never contains commas or quotes.
pub fn clean_text(text: &str) -> String {
    let stripped = markup_pattern().replace_all(text, "");
    let stripped = url_pattern().replace_all(&stripped, "");
    let lowered = stripped.to_lowercase();
    token_pattern()
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|t| !STOP_WORDS.contains(t))
        .map(|t| t.chars().filter(|c| !c.is_ascii_punctuation()).collect::<String>())
        .filter(|t| !t.is_empty() && !t.chars().all(|c| c.is_ascii_digit()))
        .filter(|t| !NOISE_WORDS.contains(&t.as_str()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parses a cleaned `label,text` dataset (header row required, blank lines skipped).
pub fn parse_dataset(bytes: &[u8]) -> Result<Vec<LabeledRecord>, ModelError> {
    let content = std::str::from_utf8(bytes)
        .map_err(|e| ModelError::InvalidData(format!("dataset is not utf-8: {}", e)))?;
    let mut lines = content.lines();
    match lines.next().map(str::trim) {
        Some(DATASET_HEADER) => {}
        Some(other) => {
            return Err(ModelError::InvalidData(format!(
                "unexpected header {:?}, want {:?}",
                other, DATASET_HEADER
            )))
        }
        None => return Err(ModelError::InvalidData("empty dataset".to_string())),
    }
    let mut out = Vec::new();
    for (i, line) in lines.enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = parse_csv_line(line).into_iter();
        match (fields.next(), fields.next()) {
            (Some(label), Some(text)) if !label.is_empty() => out.push(LabeledRecord { label, text }),
            _ => {
                return Err(ModelError::InvalidData(format!(
                    "line {}: expected label,text",
                    i + 2
                )))
            }
        }
    }
    Ok(out)
}

/// Serializes records as a `label,text` dataset. Labels and texts containing separators are
/// quoted.
pub fn write_dataset(records: &[LabeledRecord]) -> Vec<u8> {
    let mut out = String::from(DATASET_HEADER);
    out.push('\n');
    for r in records {
        out.push_str(&quote_field(&r.label));
        out.push(',');
        out.push_str(&quote_field(&r.text));
        out.push('\n');
    }
    out.into_bytes()
}

fn quote_field(s: &str) -> String {
    if s.contains(',') || s.contains('"') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
