//! Object ids and references, and parsing of reference listings.

use crate::error::{Error, Result};
use std::fmt;

/// A hex-encoded commit or tree id (SHA-1 or SHA-256 object format).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        if !matches!(value.len(), 40 | 64) {
            return Err(Error::ReferenceParse {
                line: value.to_string(),
                message: format!("object id must be 40 or 64 hex digits, got {}", value.len()),
            });
        }
        if !value.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::ReferenceParse {
                line: value.to_string(),
                message: "object id must be hexadecimal".to_string(),
            });
        }
        Ok(Self(value.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A branch, tag or cache record as seen through one remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Short name without namespace (`main`, `v1.0`, `source-<key>`).
    pub alias: String,
    /// Name on the remote (`refs/heads/main`).
    pub full_name: String,
    pub id: ObjectId,
}

/// Parse `<object id>\t<reference name>` lines, one reference per line.
///
/// Empty lines are ignored, anything else that does not have exactly two
/// columns or a valid object id fails the whole listing.
pub fn parse_listing(output: &str) -> Result<Vec<(ObjectId, String)>> {
    let mut entries = Vec::new();

    for line in output.lines() {
        if line.is_empty() {
            continue;
        }

        let columns: Vec<&str> = line.split('\t').collect();
        if columns.len() != 2 {
            return Err(Error::ReferenceParse {
                line: line.to_string(),
                message: "2 columns expected".to_string(),
            });
        }

        let id = ObjectId::parse(columns[0]).map_err(|e| Error::ReferenceParse {
            line: line.to_string(),
            message: e.to_string(),
        })?;
        entries.push((id, columns[1].to_string()));
    }

    Ok(entries)
}
