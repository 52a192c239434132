//! Persisted document metadata (`Info.json`).

use serde::{Deserialize, Serialize};

use crate::source::SourcePath;

/// Plain value data saved alongside the sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    /// Entry point handed to the engine.
    pub main_source: SourcePath,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_opened_source: Option<SourcePath>,
    /// Zero-based line the cursor was on when the document was last edited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_edited_line: Option<u32>,
}

impl DocumentMetadata {
    pub fn new(main_source: SourcePath) -> Self {
        Self {
            last_opened_source: Some(main_source.clone()),
            main_source,
            last_edited_line: None,
        }
    }

    /// Parse a metadata record. Unknown keys are ignored and reported.
    pub fn from_json(bytes: &[u8]) -> serde_json::Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let mut de = serde_json::Deserializer::from_slice(bytes);
        let metadata = serde_ignored::deserialize(&mut de, |path| ignored.push(path.to_string()))?;
        de.end()?;
        Ok((metadata, ignored))
    }

    /// Rewrite paths at or below `from` to live below `to`.
    pub fn follow_rename(&mut self, from: &SourcePath, to: &SourcePath) {
        let rebase = |path: &SourcePath| -> Option<SourcePath> {
            if !path.starts_with(from) {
                return None;
            }
            Some(path.components().skip(from.depth()).fold(to.clone(), |acc, c| acc.join(c)))
        };

        if let Some(main) = rebase(&self.main_source) {
            self.main_source = main;
        }
        if let Some(last) = self.last_opened_source.as_ref().and_then(rebase) {
            self.last_opened_source = Some(last);
        }
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}
