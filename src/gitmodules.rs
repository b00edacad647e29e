//! Literal-text rewriting of submodule configuration files.

use anyhow::Result;
use anyhow::bail;

/// Submodule configuration file at the checkout root
pub const GITMODULES_FILE: &str = ".gitmodules";

/// A single `old -> new` literal replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    pub old: String,
    pub new: String,
}

/// Parse mappings from their configured form: one `old new` pair per line,
/// separated by whitespace. Blank lines are ignored.
pub fn parse_mappings(raw: &str) -> Result<Vec<Mapping>> {
    let mut mappings = Vec::new();
    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some(old), Some(new)) => mappings.push(Mapping {
                old: old.to_string(),
                new: new.to_string(),
            }),
            _ => bail!("invalid gitmodule mapping line (expected 'old new'): {line:?}"),
        }
    }
    Ok(mappings)
}

/// Apply every mapping in order as a literal substring replacement.
/// Later mappings see the result of earlier ones.
pub fn apply_mappings(text: &str, mappings: &[Mapping]) -> String {
    mappings.iter().fold(text.to_string(), |text, mapping| {
        text.replace(&mapping.old, &mapping.new)
    })
}
