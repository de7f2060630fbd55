//! A1 notation helpers
//!
//! Ranges are composed as `Sheet!A1:Z1000`. Sheet names containing anything
//! other than ASCII alphanumerics or underscores are single-quoted, with
//! embedded quotes doubled (`'Order Details'!A2:G2`).

use once_cell::sync::Lazy;
use regex::Regex;

use super::error::BackendError;

static CELL_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z]*)([0-9]*)(?::([A-Za-z]*)([0-9]*))?$").expect("valid A1 regex")
});

/// Convert a 0-based column index into letters (0 -> A, 25 -> Z, 26 -> AA)
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Convert column letters into a 0-based index (A -> 0, AA -> 26)
pub fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    let mut n: usize = 0;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let value = (ch.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        n = n.checked_mul(26)?.checked_add(value)?;
    }
    Some(n - 1)
}

/// Quote a sheet name for use in a range when needed
pub fn quote_sheet_name(name: &str) -> String {
    let plain = !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\'', "''"))
    }
}

/// Compose `Sheet` or `Sheet!range`
pub fn qualify(sheet: &str, range: Option<&str>) -> String {
    match range {
        Some(r) if !r.is_empty() => format!("{}!{}", quote_sheet_name(sheet), r),
        _ => quote_sheet_name(sheet),
    }
}

/// Check that a caller-supplied range is a plain cell range (`A1:Z10`, `A:E`, `2:2`)
pub fn is_cell_range(range: &str) -> bool {
    !range.is_empty() && CELL_RANGE.is_match(range)
}

/// A parsed, fully qualified range. Missing bounds are open-ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct A1Range {
    pub sheet: String,
    /// 0-based inclusive column bounds
    pub start_col: Option<usize>,
    pub end_col: Option<usize>,
    /// 1-based inclusive row bounds
    pub start_row: Option<usize>,
    pub end_row: Option<usize>,
}

impl A1Range {
    /// Parse `Sheet`, `'Sheet name'!A1:B2`, `Sheet!A:C`, `Sheet!2:5` or `Sheet!A2`
    pub fn parse(input: &str) -> Result<Self, BackendError> {
        let (sheet, rest) = split_sheet(input)?;
        let mut range = A1Range {
            sheet,
            start_col: None,
            end_col: None,
            start_row: None,
            end_row: None,
        };

        let Some(cells) = rest else {
            return Ok(range);
        };

        let caps = CELL_RANGE
            .captures(cells)
            .ok_or_else(|| BackendError::invalid_range(format!("Unable to parse range: {}", input)))?;

        let group = |i: usize| caps.get(i).map(|m| m.as_str()).unwrap_or("");
        let parse_row = |s: &str| -> Result<Option<usize>, BackendError> {
            if s.is_empty() {
                return Ok(None);
            }
            match s.parse::<usize>() {
                Ok(0) | Err(_) => Err(BackendError::invalid_range(format!(
                    "Unable to parse range: {}",
                    input
                ))),
                Ok(n) => Ok(Some(n)),
            }
        };

        range.start_col = column_index(group(1));
        range.start_row = parse_row(group(2))?;

        if caps.get(3).is_some() || caps.get(4).is_some() {
            range.end_col = column_index(group(3));
            range.end_row = parse_row(group(4))?;
        } else {
            // Single cell: A2 means exactly that cell
            range.end_col = range.start_col;
            range.end_row = range.start_row;
        }

        if group(1).is_empty() && group(2).is_empty() {
            return Err(BackendError::invalid_range(format!("Unable to parse range: {}", input)));
        }

        Ok(range)
    }
}

fn split_sheet(input: &str) -> Result<(String, Option<&str>), BackendError> {
    if let Some(quoted) = input.strip_prefix('\'') {
        let mut name = String::new();
        let mut chars = quoted.char_indices().peekable();
        while let Some((i, ch)) = chars.next() {
            if ch == '\'' {
                if let Some(&(_, '\'')) = chars.peek() {
                    chars.next();
                    name.push('\'');
                    continue;
                }
                let tail = &quoted[i + 1..];
                return match tail.strip_prefix('!') {
                    Some(cells) => Ok((name, Some(cells))),
                    None if tail.is_empty() => Ok((name, None)),
                    None => Err(BackendError::invalid_range(format!(
                        "Unable to parse range: {}",
                        input
                    ))),
                };
            }
            name.push(ch);
        }
        return Err(BackendError::invalid_range(format!(
            "Unterminated sheet name in range: {}",
            input
        )));
    }

    match input.split_once('!') {
        Some((sheet, cells)) => Ok((sheet.to_string(), Some(cells))),
        None => Ok((input.to_string(), None)),
    }
}
