use std::collections::HashMap;

use codec::CodecError;

use crate::error::{CompressError, DecompressError};
use crate::persist::Compact;

/// Glyphs per encoded name id.
const ID_WIDTH: usize = 2;
/// Glyphs per track record: artist, album, title, each at [`ID_WIDTH`].
const RECORD_WIDTH: usize = 3 * ID_WIDTH;

const FIELDS: [&str; 3] = ["artist", "album", "title"];

/// Dictionary of `(artist, album, title)` name-id triples, each assigned a
/// dense track id. Indexed by id and by the comma-joined triple string.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TrackTable {
    by_id: Vec<[u32; 3]>,
    by_key: HashMap<String, u32>,
}

fn triple_key(triple: [u32; 3]) -> String {
    format!("{},{},{}", triple[0], triple[1], triple[2])
}

impl TrackTable {
    /// Register a triple, returning its track id. A known triple returns
    /// the existing id.
    pub fn add(&mut self, triple: [u32; 3]) -> u32 {
        let key = triple_key(triple);
        if let Some(&id) = self.by_key.get(&key) {
            return id;
        }
        let id = self.by_id.len() as u32;
        self.by_key.insert(key, id);
        self.by_id.push(triple);
        id
    }

    pub fn triple(&self, id: u32) -> Option<[u32; 3]> {
        self.by_id.get(id as usize).copied()
    }

    /// Look up by the canonical `"artist,album,title"` joined-id key.
    pub fn id_for_key(&self, key: &str) -> Option<u32> {
        self.by_key.get(key).copied()
    }

    pub fn id_for(&self, triple: [u32; 3]) -> Option<u32> {
        self.id_for_key(&triple_key(triple))
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, [u32; 3])> + '_ {
        self.by_id
            .iter()
            .enumerate()
            .map(|(id, &triple)| (id as u32, triple))
    }
}

impl Compact for TrackTable {
    fn compress(&self) -> Result<String, CompressError> {
        let mut out = String::with_capacity(self.by_id.len() * RECORD_WIDTH);
        for (id, triple) in self.iter() {
            for (component, field) in triple.into_iter().zip(FIELDS) {
                let code = codec::encode_fixed(component as u64, ID_WIDTH).map_err(|err| {
                    match err {
                        CodecError::WidthOverflow { value, .. } => CompressError::Width {
                            table: "tracks",
                            field,
                            id,
                            value,
                        },
                        // encode_fixed only fails on width overflow
                        other => unreachable!("unexpected codec error: {}", other),
                    }
                })?;
                out.push_str(&code);
            }
        }
        Ok(out)
    }

    fn decompress(&mut self, text: &str) -> Result<(), DecompressError> {
        let chars: Vec<char> = text.chars().collect();
        if chars.len() % RECORD_WIDTH != 0 {
            return Err(DecompressError::BadLength {
                table: "tracks",
                len: chars.len(),
                unit: RECORD_WIDTH,
            });
        }
        let mut by_id = Vec::with_capacity(chars.len() / RECORD_WIDTH);
        let mut by_key = HashMap::new();
        for record in chars.chunks(RECORD_WIDTH) {
            let mut triple = [0u32; 3];
            for (slot, code) in triple.iter_mut().zip(record.chunks(ID_WIDTH)) {
                let text: String = code.iter().collect();
                *slot = codec::decode(&text)? as u32;
            }
            let id = by_id.len() as u32;
            by_key.insert(triple_key(triple), id);
            by_id.push(triple);
        }
        if by_key.len() != by_id.len() {
            return Err(DecompressError::CountMismatch {
                table: "tracks",
                expected: by_id.len(),
                actual: by_key.len(),
            });
        }
        self.by_id = by_id;
        self.by_key = by_key;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_and_restores_both_indexes() {
        let mut tracks = TrackTable::default();
        assert_eq!(tracks.add([0, 1, 2]), 0);
        assert_eq!(tracks.add([0, 1, 3]), 1);

        let text = tracks.compress().unwrap();
        assert_eq!(text.chars().count(), 12);

        let mut restored = TrackTable::default();
        restored.decompress(&text).unwrap();
        assert_eq!(restored.id_for_key("0,1,2"), Some(0));
        assert_eq!(restored.triple(0), Some([0, 1, 2]));
        assert_eq!(restored, tracks);
    }

    #[test]
    fn re_adding_a_triple_returns_the_existing_id() {
        let mut tracks = TrackTable::default();
        assert_eq!(tracks.add([4, 5, 6]), 0);
        assert_eq!(tracks.add([4, 5, 6]), 0);
        assert_eq!(tracks.len(), 1);
    }

    #[test]
    fn component_above_field_capacity_fails_at_compress() {
        let cap = (codec::ALPHABET_SIZE * codec::ALPHABET_SIZE) as u32;
        let mut tracks = TrackTable::default();
        tracks.add([0, cap, 1]);
        assert_eq!(
            tracks.compress(),
            Err(CompressError::Width {
                table: "tracks",
                field: "album",
                id: 0,
                value: cap as u64,
            })
        );
    }

    #[test]
    fn truncated_input_is_a_framing_error() {
        let mut tracks = TrackTable::default();
        tracks.add([1, 2, 3]);
        let mut text = tracks.compress().unwrap();
        text.pop();
        let mut restored = TrackTable::default();
        assert_eq!(
            restored.decompress(&text),
            Err(DecompressError::BadLength {
                table: "tracks",
                len: 5,
                unit: 6,
            })
        );
    }

    #[test]
    fn empty_table_round_trips() {
        let tracks = TrackTable::default();
        let mut restored = TrackTable::default();
        restored.decompress(&tracks.compress().unwrap()).unwrap();
        assert!(restored.is_empty());
    }
}
