use codec::CodecError;

use crate::store::StoreError;

/// Rejected input at an `add`-style entry point. Nothing is stored when one
/// of these is returned.
#[derive(Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// A name carries the newline record delimiter.
    EmbeddedDelimiter(String),
    /// Image size in pixels outside the enumerated size set.
    UnknownSize(u32),
    /// Image file extension outside the enumerated format set.
    UnknownExt(String),
    /// Image URL did not yield size, hash, and extension tokens.
    MalformedUrl(String),
    /// A name that must already be interned was not found.
    UnresolvedName(String),
    /// An id that must exist in its target table was not found.
    UnresolvedId(u32),
    /// Calendar month outside 1..=12.
    InvalidMonth(u8),
    /// Usernames shorter than 2 characters collide with the reserved
    /// single-character table keys.
    ReservedKey(String),
    /// A track component id with no entry in the name table.
    DanglingTrackName {
        track: u32,
        field: &'static str,
        name_id: u32,
    },
    /// An image record whose name or hash id has no entry in the name table.
    DanglingImageName { table: &'static str, name_id: u32 },
    /// A user stats entry referencing a track id with no entry in the track
    /// table.
    DanglingUserTrack { user: String, track: u32 },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::EmbeddedDelimiter(name) => {
                write!(f, "name {:?} contains the record delimiter", name)
            }
            ValidationError::UnknownSize(px) => write!(f, "unknown image size: {}px", px),
            ValidationError::UnknownExt(ext) => write!(f, "unknown image extension: {:?}", ext),
            ValidationError::MalformedUrl(url) => write!(f, "malformed image url: {:?}", url),
            ValidationError::UnresolvedName(name) => write!(f, "unresolved name: {:?}", name),
            ValidationError::UnresolvedId(id) => write!(f, "unresolved id: {}", id),
            ValidationError::InvalidMonth(month) => write!(f, "invalid month: {}", month),
            ValidationError::ReservedKey(key) => {
                write!(f, "key {:?} is reserved for shared tables", key)
            }
            ValidationError::DanglingTrackName {
                track,
                field,
                name_id,
            } => write!(
                f,
                "track {} references missing {} name id {}",
                track, field, name_id
            ),
            ValidationError::DanglingImageName { table, name_id } => {
                write!(f, "{} record references missing name id {}", table, name_id)
            }
            ValidationError::DanglingUserTrack { user, track } => {
                write!(f, "user {:?} references missing track id {}", user, track)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Failure while serializing a table. The persisted formats are positional,
/// so an overflowing field aborts the whole compress instead of truncating.
#[derive(Debug, PartialEq, Eq)]
pub enum CompressError {
    /// A value needs more glyphs than its fixed field width allows.
    Width {
        table: &'static str,
        field: &'static str,
        id: u32,
        value: u64,
    },
    /// A play count above the single-digit ceiling of the stats format.
    PlayCount {
        year: u16,
        month: u8,
        track: u32,
        count: u32,
    },
}

impl std::fmt::Display for CompressError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompressError::Width {
                table,
                field,
                id,
                value,
            } => write!(
                f,
                "{} table: {} value {} for id {} exceeds its field width",
                table, field, value, id
            ),
            CompressError::PlayCount {
                year,
                month,
                track,
                count,
            } => write!(
                f,
                "play count {} for track {} in {}-{:02} exceeds the single-digit field",
                count, track, year, month
            ),
        }
    }
}

impl std::error::Error for CompressError {}

/// Failure while rebuilding a table from its persisted string.
#[derive(Debug, PartialEq, Eq)]
pub enum DecompressError {
    Codec(CodecError),
    /// Input length is not a multiple of the record size.
    BadLength {
        table: &'static str,
        len: usize,
        unit: usize,
    },
    /// Rebuilt index sizes disagree, e.g. duplicate entries in the input.
    CountMismatch {
        table: &'static str,
        expected: usize,
        actual: usize,
    },
    /// A combined size/format code outside both enumerated sets.
    UnknownCombinedCode(u64),
    /// A month line appeared before any year header.
    OrphanMonthLine,
    /// A month code outside 1..=12.
    BadMonth(u64),
    /// A year header above the representable year range.
    BadYear(u64),
}

impl std::fmt::Display for DecompressError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecompressError::Codec(err) => write!(f, "codec error: {}", err),
            DecompressError::BadLength { table, len, unit } => write!(
                f,
                "{} table: input length {} is not a multiple of {}",
                table, len, unit
            ),
            DecompressError::CountMismatch {
                table,
                expected,
                actual,
            } => write!(
                f,
                "{} table: expected {} entries, rebuilt {}",
                table, expected, actual
            ),
            DecompressError::UnknownCombinedCode(code) => {
                write!(f, "unknown combined size/format code: {}", code)
            }
            DecompressError::OrphanMonthLine => {
                write!(f, "month line before any year header")
            }
            DecompressError::BadMonth(month) => write!(f, "month code out of range: {}", month),
            DecompressError::BadYear(year) => write!(f, "year out of range: {}", year),
        }
    }
}

impl std::error::Error for DecompressError {}

impl From<CodecError> for DecompressError {
    fn from(err: CodecError) -> Self {
        DecompressError::Codec(err)
    }
}

/// Aggregate-level error for load/save and ingestion paths.
#[derive(Debug)]
pub enum LibraryError {
    Validation(ValidationError),
    Compress(CompressError),
    Decompress(DecompressError),
    Store(StoreError),
}

impl std::fmt::Display for LibraryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LibraryError::Validation(err) => write!(f, "validation error: {}", err),
            LibraryError::Compress(err) => write!(f, "compress error: {}", err),
            LibraryError::Decompress(err) => write!(f, "decompress error: {}", err),
            LibraryError::Store(err) => write!(f, "store error: {}", err),
        }
    }
}

impl std::error::Error for LibraryError {}

impl From<ValidationError> for LibraryError {
    fn from(err: ValidationError) -> Self {
        LibraryError::Validation(err)
    }
}

impl From<CompressError> for LibraryError {
    fn from(err: CompressError) -> Self {
        LibraryError::Compress(err)
    }
}

impl From<DecompressError> for LibraryError {
    fn from(err: DecompressError) -> Self {
        LibraryError::Decompress(err)
    }
}

impl From<StoreError> for LibraryError {
    fn from(err: StoreError) -> Self {
        LibraryError::Store(err)
    }
}
