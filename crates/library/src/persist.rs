use tracing::{debug, info};

use crate::error::{CompressError, DecompressError, LibraryError, ValidationError};
use crate::store::StringStore;

/// Reserved single-character keys for the shared tables. Longer keys hold
/// per-user stats blobs.
pub const NAMES_KEY: &str = "n";
pub const TRACKS_KEY: &str = "t";
pub const ARTIST_IMAGES_KEY: &str = "a";
pub const ALBUM_IMAGES_KEY: &str = "b";

/// The serialization contract every table type implements. `decompress`
/// replaces the table wholesale; partially applied input is never visible.
pub trait Compact {
    fn compress(&self) -> Result<String, CompressError>;
    fn decompress(&mut self, text: &str) -> Result<(), DecompressError>;
}

/// Validate a username as a store key. Single-character keys belong to the
/// shared tables.
pub fn user_key(username: &str) -> Result<&str, ValidationError> {
    if username.chars().count() < 2 {
        return Err(ValidationError::ReservedKey(username.to_string()));
    }
    Ok(username)
}

/// Read the value at `key` and rebuild `table` from it. Returns `false`
/// (and leaves the table untouched) when the key is absent.
pub fn load<T: Compact>(
    store: &dyn StringStore,
    key: &str,
    table: &mut T,
) -> Result<bool, LibraryError> {
    match store.get(key)? {
        Some(text) => {
            table.decompress(&text)?;
            info!("Loaded key {:?} ({} chars)", key, text.chars().count());
            Ok(true)
        }
        None => {
            debug!("No value at key {:?}", key);
            Ok(false)
        }
    }
}

/// Serialize `table` and write it at `key`.
pub fn save<T: Compact>(store: &dyn StringStore, key: &str, table: &T) -> Result<(), LibraryError> {
    let text = table.compress()?;
    store.set(key, &text)?;
    info!("Saved key {:?} ({} chars)", key, text.chars().count());
    Ok(())
}
