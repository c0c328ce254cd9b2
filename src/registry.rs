//! Whitelist of valid Pure Data object names.
//!
//! Loaded once at startup from a CSV with an `objects` column and shared
//! read-only by every validation afterwards.

use crate::error::ResourceError;
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct SymbolRegistry {
    symbols: HashSet<String>,
}

impl SymbolRegistry {
    /// Load the registry from a CSV file with an `objects` header column.
    ///
    /// Rows with an empty object name are skipped; surrounding whitespace is
    /// trimmed. Fails if the file is unreadable, the CSV is malformed, or the
    /// column is absent.
    pub fn load(path: &Path) -> Result<Self, ResourceError> {
        let mut reader =
            csv::Reader::from_path(path).map_err(|e| ResourceError::csv(path, e))?;

        let headers = reader
            .headers()
            .map_err(|e| ResourceError::csv(path, e))?
            .clone();
        let column = headers
            .iter()
            .position(|h| h.trim() == "objects")
            .ok_or_else(|| ResourceError::MissingColumn {
                path: path.to_path_buf(),
                column: "objects",
            })?;

        let mut symbols = HashSet::new();
        for record in reader.records() {
            let record = record.map_err(|e| ResourceError::csv(path, e))?;
            if let Some(field) = record.get(column) {
                let name = field.trim();
                if !name.is_empty() {
                    symbols.insert(name.to_string());
                }
            }
        }

        Ok(SymbolRegistry { symbols })
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.contains(symbol)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl FromIterator<String> for SymbolRegistry {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        SymbolRegistry {
            symbols: iter.into_iter().collect(),
        }
    }
}
