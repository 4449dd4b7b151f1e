use std::collections::BTreeMap;

use codec::CodecError;
use common::{ImageKind, ImageSize};

use crate::error::{CompressError, DecompressError, ValidationError};
use crate::names::NameTable;
use crate::persist::Compact;

const ID_WIDTH: usize = 2;
/// 2-glyph name id, 1-glyph combined size/format code, 2-glyph hash id.
const RECORD_WIDTH: usize = 5;

/// Image metadata for one name (artist or album), keyed by its name-table
/// id. The hash string is interned into the shared [`NameTable`] and only
/// its id is stored here, so records stay fixed-width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageRecord {
    pub size: ImageSize,
    pub kind: ImageKind,
    pub hash_id: u32,
}

/// Reference to an image slot: either a name-table id or the name itself.
#[derive(Debug, Clone, Copy)]
pub enum ImageKey<'a> {
    Id(u32),
    Name(&'a str),
}

/// Sparse per-name image table. Two instances exist, one for artist images
/// and one for album images; they share the numeric size classes but render
/// different size labels in URLs (the album variant appends a suffix).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageTable {
    tag: &'static str,
    base_url: String,
    label_suffix: &'static str,
    records: BTreeMap<u32, ImageRecord>,
}

impl ImageTable {
    pub fn artists(base_url: &str) -> Self {
        Self {
            tag: "artist images",
            base_url: base_url.to_string(),
            label_suffix: "",
            records: BTreeMap::new(),
        }
    }

    pub fn albums(base_url: &str) -> Self {
        Self {
            tag: "album images",
            base_url: base_url.to_string(),
            label_suffix: "s",
            records: BTreeMap::new(),
        }
    }

    /// Same parameters, no records. Used when rebuilding from the store.
    pub(crate) fn cleared(&self) -> Self {
        Self {
            tag: self.tag,
            base_url: self.base_url.clone(),
            label_suffix: self.label_suffix,
            records: BTreeMap::new(),
        }
    }

    pub(crate) fn tag(&self) -> &'static str {
        self.tag
    }

    fn resolve(&self, key: ImageKey<'_>, names: &NameTable) -> Result<u32, ValidationError> {
        match key {
            ImageKey::Id(id) => match names.name(id) {
                Some(_) => Ok(id),
                None => Err(ValidationError::UnresolvedId(id)),
            },
            ImageKey::Name(name) => names
                .id(name)
                .ok_or_else(|| ValidationError::UnresolvedName(name.to_string())),
        }
    }

    /// Store image metadata for `key`. The key must already resolve in the
    /// name table; no name is created for it. The hash string is interned.
    /// Overwrites any prior record for the same id.
    pub fn add(
        &mut self,
        key: ImageKey<'_>,
        size_px: u32,
        hash: &str,
        ext: &str,
        names: &mut NameTable,
    ) -> Result<u32, ValidationError> {
        let size = ImageSize::from_px(size_px).ok_or(ValidationError::UnknownSize(size_px))?;
        let kind =
            ImageKind::from_ext(ext).ok_or_else(|| ValidationError::UnknownExt(ext.to_string()))?;
        let id = self.resolve(key, names)?;
        let hash_id = names.add(hash)?;
        self.records.insert(
            id,
            ImageRecord {
                size,
                kind,
                hash_id,
            },
        );
        Ok(id)
    }

    /// Extract the trailing `<size>/<hash>.<ext>` tokens from a service URL
    /// and store them via [`ImageTable::add`].
    pub fn add_url(
        &mut self,
        key: ImageKey<'_>,
        url: &str,
        names: &mut NameTable,
    ) -> Result<u32, ValidationError> {
        let (size_px, hash, ext) =
            parse_image_url(url).ok_or_else(|| ValidationError::MalformedUrl(url.to_string()))?;
        self.add(key, size_px, hash, ext, names)
    }

    pub fn get(&self, id: u32) -> Option<&ImageRecord> {
        self.records.get(&id)
    }

    /// Reconstruct the canonical image URL for `key`:
    /// `base_url + size_label + '/' + hash + '.' + ext`.
    pub fn url(&self, key: ImageKey<'_>, names: &NameTable) -> Result<String, ValidationError> {
        let id = self.resolve(key, names)?;
        let record = self
            .records
            .get(&id)
            .ok_or(ValidationError::UnresolvedId(id))?;
        let hash = names
            .name(record.hash_id)
            .ok_or(ValidationError::UnresolvedId(record.hash_id))?;
        Ok(format!(
            "{}{}{}/{}.{}",
            self.base_url,
            record.size.px(),
            self.label_suffix,
            hash,
            record.kind.ext()
        ))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &ImageRecord)> + '_ {
        self.records.iter().map(|(&id, record)| (id, record))
    }
}

fn parse_image_url(url: &str) -> Option<(u32, &str, &str)> {
    let mut segments = url.rsplit('/');
    let file = segments.next()?;
    let size_segment = segments.next()?;
    let (hash, ext) = file.rsplit_once('.')?;
    if hash.is_empty() {
        return None;
    }
    ImageKind::from_ext(ext)?;
    let digits: &str = {
        let end = size_segment
            .char_indices()
            .find(|(_, ch)| !ch.is_ascii_digit())
            .map(|(at, _)| at)
            .unwrap_or(size_segment.len());
        &size_segment[..end]
    };
    if digits.is_empty() {
        return None;
    }
    let px = digits.parse().ok()?;
    Some((px, hash, ext))
}

impl Compact for ImageTable {
    fn compress(&self) -> Result<String, CompressError> {
        let mut out = String::with_capacity(self.records.len() * RECORD_WIDTH);
        for (id, record) in self.iter() {
            let width_err = |field: &'static str, err: CodecError| match err {
                CodecError::WidthOverflow { value, .. } => CompressError::Width {
                    table: self.tag,
                    field,
                    id,
                    value,
                },
                other => unreachable!("unexpected codec error: {}", other),
            };
            out.push_str(
                &codec::encode_fixed(id as u64, ID_WIDTH).map_err(|err| width_err("name id", err))?,
            );
            let combined = record.kind.code() + record.size.index();
            // combined is at most 34, always a single glyph
            out.push_str(&codec::encode(combined));
            out.push_str(
                &codec::encode_fixed(record.hash_id as u64, ID_WIDTH)
                    .map_err(|err| width_err("hash id", err))?,
            );
        }
        Ok(out)
    }

    fn decompress(&mut self, text: &str) -> Result<(), DecompressError> {
        let chars: Vec<char> = text.chars().collect();
        if chars.len() % RECORD_WIDTH != 0 {
            return Err(DecompressError::BadLength {
                table: self.tag,
                len: chars.len(),
                unit: RECORD_WIDTH,
            });
        }
        let expected = chars.len() / RECORD_WIDTH;
        let mut records = BTreeMap::new();
        for record in chars.chunks(RECORD_WIDTH) {
            let id = decode_chunk(&record[..ID_WIDTH])? as u32;
            let combined = decode_chunk(&record[ID_WIDTH..ID_WIDTH + 1])?;
            let size_index = combined % 10;
            let size = ImageSize::from_index(size_index)
                .ok_or(DecompressError::UnknownCombinedCode(combined))?;
            let kind = ImageKind::from_code(combined - size_index)
                .ok_or(DecompressError::UnknownCombinedCode(combined))?;
            let hash_id = decode_chunk(&record[ID_WIDTH + 1..])? as u32;
            records.insert(
                id,
                ImageRecord {
                    size,
                    kind,
                    hash_id,
                },
            );
        }
        if records.len() != expected {
            return Err(DecompressError::CountMismatch {
                table: self.tag,
                expected,
                actual: records.len(),
            });
        }
        self.records = records;
        Ok(())
    }
}

fn decode_chunk(chars: &[char]) -> Result<u64, DecompressError> {
    let text: String = chars.iter().collect();
    Ok(codec::decode(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://img.example.net/serve/";

    fn names_with(entries: &[&str]) -> NameTable {
        let mut names = NameTable::default();
        for entry in entries {
            names.add(entry).unwrap();
        }
        names
    }

    #[test]
    fn artist_and_album_labels_differ() {
        let mut names = names_with(&["Radiohead"]);
        let mut artists = ImageTable::artists(BASE);
        let mut albums = ImageTable::albums(BASE);
        artists
            .add(ImageKey::Id(0), 64, "ab12cd", "jpg", &mut names)
            .unwrap();
        albums
            .add(ImageKey::Id(0), 64, "ab12cd", "jpg", &mut names)
            .unwrap();

        let artist_url = artists.url(ImageKey::Id(0), &names).unwrap();
        let album_url = albums.url(ImageKey::Id(0), &names).unwrap();
        assert_eq!(artist_url, format!("{}64/ab12cd.jpg", BASE));
        assert_eq!(album_url, format!("{}64s/ab12cd.jpg", BASE));
    }

    #[test]
    fn resolves_names_without_creating_them() {
        let mut names = names_with(&["Radiohead"]);
        let mut artists = ImageTable::artists(BASE);
        assert_eq!(
            artists.add(ImageKey::Name("Radiohead"), 64, "ff00", "png", &mut names),
            Ok(0)
        );
        assert_eq!(
            artists.add(ImageKey::Name("Björk"), 64, "ff00", "png", &mut names),
            Err(ValidationError::UnresolvedName("Björk".to_string()))
        );
    }

    #[test]
    fn rejects_unknown_size_and_extension() {
        let mut names = names_with(&["Radiohead"]);
        let mut artists = ImageTable::artists(BASE);
        assert_eq!(
            artists.add(ImageKey::Id(0), 65, "ff00", "png", &mut names),
            Err(ValidationError::UnknownSize(65))
        );
        assert_eq!(
            artists.add(ImageKey::Id(0), 64, "ff00", "bmp", &mut names),
            Err(ValidationError::UnknownExt("bmp".to_string()))
        );
        assert!(artists.is_empty());
    }

    #[test]
    fn extracts_url_tokens() {
        let mut names = names_with(&["Radiohead"]);
        let mut albums = ImageTable::albums(BASE);
        albums
            .add_url(
                ImageKey::Id(0),
                "http://img.example.net/serve/126s/8ca1f2de.png",
                &mut names,
            )
            .unwrap();
        let record = albums.get(0).unwrap();
        assert_eq!(record.size, ImageSize::Px126);
        assert_eq!(record.kind, ImageKind::Png);
        assert_eq!(names.name(record.hash_id), Some("8ca1f2de"));
    }

    #[test]
    fn malformed_urls_are_rejected() {
        let mut names = names_with(&["Radiohead"]);
        let mut albums = ImageTable::albums(BASE);
        for url in ["", "no-tokens", "http://x/64s/nodot", "http://x/s/h.png"] {
            assert_eq!(
                albums.add_url(ImageKey::Id(0), url, &mut names),
                Err(ValidationError::MalformedUrl(url.to_string())),
                "url {:?}",
                url
            );
        }
    }

    #[test]
    fn sparse_table_round_trips() {
        let mut names = names_with(&["a", "b", "c", "d", "e", "f"]);
        let mut artists = ImageTable::artists(BASE);
        // ids 1 and 4 only, leaving holes
        artists
            .add(ImageKey::Id(1), 34, "h1", "gif", &mut names)
            .unwrap();
        artists
            .add(ImageKey::Id(4), 300, "h4", "jpeg", &mut names)
            .unwrap();

        let text = artists.compress().unwrap();
        assert_eq!(text.chars().count(), 10);

        let mut restored = artists.cleared();
        restored.decompress(&text).unwrap();
        assert_eq!(restored, artists);
        assert!(restored.get(0).is_none());
        assert!(restored.get(2).is_none());
    }

    #[test]
    fn overwrites_prior_record_for_the_same_id() {
        let mut names = names_with(&["Radiohead"]);
        let mut artists = ImageTable::artists(BASE);
        artists
            .add(ImageKey::Id(0), 64, "old", "png", &mut names)
            .unwrap();
        artists
            .add(ImageKey::Id(0), 252, "new", "jpg", &mut names)
            .unwrap();
        assert_eq!(artists.len(), 1);
        let record = artists.get(0).unwrap();
        assert_eq!(record.size, ImageSize::Px252);
        assert_eq!(names.name(record.hash_id), Some("new"));
    }

    #[test]
    fn unknown_combined_code_is_a_decompress_error() {
        let mut text = String::new();
        text.push_str(&codec::encode_fixed(0, 2).unwrap());
        text.push_str(&codec::encode(47)); // kind code 40 does not exist
        text.push_str(&codec::encode_fixed(1, 2).unwrap());
        let mut artists = ImageTable::artists(BASE);
        assert_eq!(
            artists.decompress(&text),
            Err(DecompressError::UnknownCombinedCode(47))
        );
    }
}
