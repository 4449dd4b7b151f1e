//! Compact music-library store.
//!
//! The backing store only offers a handful of string-valued keys with tight
//! per-key size limits, so every table serializes to a dense, mostly
//! delimiter-free glyph string (see the `codec` crate) and reconstructs
//! exactly. [`Library`] owns one instance of each table and wires the
//! cross-table id references together.

use std::collections::BTreeMap;
use std::sync::Arc;

use common::{PlayRecord, TrackRecord};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;

mod error;
mod images;
mod names;
mod persist;
mod stats;
mod store;
mod tracks;

pub use error::{CompressError, DecompressError, LibraryError, ValidationError};
pub use images::{ImageKey, ImageRecord, ImageTable};
pub use names::NameTable;
pub use persist::{
    load, save, user_key, Compact, ALBUM_IMAGES_KEY, ARTIST_IMAGES_KEY, NAMES_KEY, TRACKS_KEY,
};
pub use stats::{UserStats, PLAY_COUNT_MAX};
pub use store::{MemoryStore, RedbStore, StoreError, StringStore};
pub use tracks::TrackTable;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Prefix of every reconstructed image URL.
    pub image_base_url: String,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            image_base_url: "http://userserve-ak.last.fm/serve/".to_string(),
        }
    }
}

/// The whole in-memory dataset: interned names, track triples, the two image
/// tables, and per-user listening stats. All cross-table references go
/// through the ids handed out by the tables here; nothing is global.
pub struct Library {
    names: NameTable,
    tracks: TrackTable,
    artist_images: ImageTable,
    album_images: ImageTable,
    users: BTreeMap<String, UserStats>,
}

/// Handle for callers that share a [`Library`] across threads. `add` and
/// `load` take the write lock; lookups and `save` the read lock.
pub type SharedLibrary = Arc<RwLock<Library>>;

impl Library {
    pub fn new(config: &LibraryConfig) -> Self {
        Self {
            names: NameTable::default(),
            tracks: TrackTable::default(),
            artist_images: ImageTable::artists(&config.image_base_url),
            album_images: ImageTable::albums(&config.image_base_url),
            users: BTreeMap::new(),
        }
    }

    pub fn into_shared(self) -> SharedLibrary {
        Arc::new(RwLock::new(self))
    }

    pub fn names(&self) -> &NameTable {
        &self.names
    }

    pub fn tracks(&self) -> &TrackTable {
        &self.tracks
    }

    pub fn artist_images(&self) -> &ImageTable {
        &self.artist_images
    }

    pub fn album_images(&self) -> &ImageTable {
        &self.album_images
    }

    pub fn user(&self, username: &str) -> Option<&UserStats> {
        self.users.get(username)
    }

    pub fn usernames(&self) -> impl Iterator<Item = &str> + '_ {
        self.users.keys().map(String::as_str)
    }

    /// Intern one normalized upstream record: artist, album, and title
    /// names, the track triple, and any attached image URLs. Returns the
    /// track id.
    pub fn ingest_track(&mut self, record: &TrackRecord) -> Result<u32, LibraryError> {
        let artist = self.names.add(&record.artist)?;
        let album = self.names.add(&record.album)?;
        let title = self.names.add(&record.title)?;
        let track = self.tracks.add([artist, album, title]);
        if let Some(url) = &record.artist_image_url {
            self.artist_images
                .add_url(ImageKey::Id(artist), url, &mut self.names)?;
        }
        if let Some(url) = &record.album_image_url {
            self.album_images
                .add_url(ImageKey::Id(album), url, &mut self.names)?;
        }
        Ok(track)
    }

    /// Record one listening event against an already ingested track.
    pub fn ingest_play(&mut self, track: u32, record: &PlayRecord) -> Result<(), LibraryError> {
        if self.tracks.triple(track).is_none() {
            return Err(ValidationError::UnresolvedId(track).into());
        }
        persist::user_key(&record.user)?;
        self.users
            .entry(record.user.clone())
            .or_default()
            .record_play(record.year, record.month, track, record.plays)?;
        Ok(())
    }

    pub fn love(&mut self, username: &str, track: u32) -> Result<(), LibraryError> {
        if self.tracks.triple(track).is_none() {
            return Err(ValidationError::UnresolvedId(track).into());
        }
        persist::user_key(username)?;
        self.users.entry(username.to_string()).or_default().love(track);
        Ok(())
    }

    pub fn artist_image_url(&self, name: &str) -> Result<String, LibraryError> {
        Ok(self.artist_images.url(ImageKey::Name(name), &self.names)?)
    }

    pub fn album_image_url(&self, name: &str) -> Result<String, LibraryError> {
        Ok(self.album_images.url(ImageKey::Name(name), &self.names)?)
    }

    /// Check that every cross-table id reference resolves: track components
    /// against the name table, image records against the name table, user
    /// stats against the track table.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (track, triple) in self.tracks.iter() {
            for (component, field) in triple.into_iter().zip(["artist", "album", "title"]) {
                if self.names.name(component).is_none() {
                    return Err(ValidationError::DanglingTrackName {
                        track,
                        field,
                        name_id: component,
                    });
                }
            }
        }
        for table in [&self.artist_images, &self.album_images] {
            for (id, record) in table.iter() {
                if self.names.name(id).is_none() {
                    return Err(ValidationError::DanglingImageName {
                        table: table.tag(),
                        name_id: id,
                    });
                }
                if self.names.name(record.hash_id).is_none() {
                    return Err(ValidationError::DanglingImageName {
                        table: table.tag(),
                        name_id: record.hash_id,
                    });
                }
            }
        }
        for (user, stats) in &self.users {
            for track in stats.track_ids() {
                if self.tracks.triple(track).is_none() {
                    return Err(ValidationError::DanglingUserTrack {
                        user: user.clone(),
                        track,
                    });
                }
            }
        }
        Ok(())
    }

    /// Serialize every table into the store. References are validated first;
    /// a dangling id aborts the save before anything is written.
    pub fn save(&self, store: &dyn StringStore) -> Result<(), LibraryError> {
        self.validate()?;
        persist::save(store, persist::NAMES_KEY, &self.names)?;
        persist::save(store, persist::TRACKS_KEY, &self.tracks)?;
        persist::save(store, persist::ARTIST_IMAGES_KEY, &self.artist_images)?;
        persist::save(store, persist::ALBUM_IMAGES_KEY, &self.album_images)?;
        for (user, stats) in &self.users {
            persist::save(store, persist::user_key(user)?, stats)?;
        }
        info!(
            "Saved library: {} names, {} tracks, {} users",
            self.names.len(),
            self.tracks.len(),
            self.users.len()
        );
        Ok(())
    }

    /// Rebuild the whole dataset from the store. The new tables are decoded
    /// and cross-validated before replacing the current ones, so readers see
    /// either the old library or the fully reloaded one.
    pub fn load(&mut self, store: &dyn StringStore, usernames: &[&str]) -> Result<(), LibraryError> {
        let mut names = NameTable::default();
        persist::load(store, persist::NAMES_KEY, &mut names)?;
        let mut tracks = TrackTable::default();
        persist::load(store, persist::TRACKS_KEY, &mut tracks)?;
        let mut artist_images = self.artist_images.cleared();
        persist::load(store, persist::ARTIST_IMAGES_KEY, &mut artist_images)?;
        let mut album_images = self.album_images.cleared();
        persist::load(store, persist::ALBUM_IMAGES_KEY, &mut album_images)?;

        let mut users = BTreeMap::new();
        for &username in usernames {
            let key = persist::user_key(username)?;
            let mut stats = UserStats::default();
            persist::load(store, key, &mut stats)?;
            users.insert(username.to_string(), stats);
        }

        let fresh = Library {
            names,
            tracks,
            artist_images,
            album_images,
            users,
        };
        fresh.validate()?;
        *self = fresh;
        info!(
            "Loaded library: {} names, {} tracks, {} users",
            self.names.len(),
            self.tracks.len(),
            self.users.len()
        );
        Ok(())
    }
}

impl Default for Library {
    fn default() -> Self {
        Self::new(&LibraryConfig::default())
    }
}
