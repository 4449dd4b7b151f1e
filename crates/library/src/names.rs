use std::collections::HashMap;

use crate::error::{CompressError, DecompressError, ValidationError};
use crate::persist::Compact;

/// String-interning dictionary: every distinct name (artist, album, track
/// title, image hash) gets a dense integer id, assigned sequentially from 0
/// and never reused. Both directions are indexed and kept in sync.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NameTable {
    by_id: Vec<String>,
    by_name: HashMap<String, u32>,
}

impl NameTable {
    /// Intern `name`, returning its id. Re-adding a known name returns the
    /// existing id. Names may not contain the newline record delimiter.
    pub fn add(&mut self, name: &str) -> Result<u32, ValidationError> {
        if name.contains('\n') {
            return Err(ValidationError::EmbeddedDelimiter(name.to_string()));
        }
        if let Some(&id) = self.by_name.get(name) {
            return Ok(id);
        }
        let id = self.by_id.len() as u32;
        self.by_name.insert(name.to_string(), id);
        self.by_id.push(name.to_string());
        Ok(id)
    }

    pub fn name(&self, id: u32) -> Option<&str> {
        self.by_id.get(id as usize).map(String::as_str)
    }

    pub fn id(&self, name: &str) -> Option<u32> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl Compact for NameTable {
    fn compress(&self) -> Result<String, CompressError> {
        Ok(self.by_id.join("\n"))
    }

    fn decompress(&mut self, text: &str) -> Result<(), DecompressError> {
        let mut by_id = Vec::new();
        let mut by_name = HashMap::new();
        if !text.is_empty() {
            for line in text.split('\n') {
                let id = by_id.len() as u32;
                by_name.insert(line.to_string(), id);
                by_id.push(line.to_string());
            }
        }
        // Duplicate names in the input collapse in the reverse index; that
        // is persisted-data corruption, not a table state we accept.
        if by_name.len() != by_id.len() {
            return Err(DecompressError::CountMismatch {
                table: "names",
                expected: by_id.len(),
                actual: by_name.len(),
            });
        }
        self.by_id = by_id;
        self.by_name = by_name;
        Ok(())
    }
}
