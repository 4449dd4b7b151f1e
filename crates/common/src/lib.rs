use serde::{Deserialize, Serialize};

/// One normalized track as delivered by the upstream API client: plain
/// strings plus whatever image URLs the service attached.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrackRecord {
    pub artist: String,
    pub album: String,
    pub title: String,
    #[serde(default)]
    pub artist_image_url: Option<String>,
    #[serde(default)]
    pub album_image_url: Option<String>,
}

/// One normalized listening event for a user, already bucketed by calendar
/// month by the upstream collaborator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlayRecord {
    pub user: String,
    pub year: u16,
    /// Calendar month, 1 through 12.
    pub month: u8,
    pub plays: u32,
}

/// The image size classes the service serves. Encoded as a single digit of
/// the combined size/format code, so the set must stay below 10 entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageSize {
    Px34,
    Px64,
    Px126,
    Px252,
    Px300,
}

impl ImageSize {
    pub fn from_px(px: u32) -> Option<Self> {
        match px {
            34 => Some(ImageSize::Px34),
            64 => Some(ImageSize::Px64),
            126 => Some(ImageSize::Px126),
            252 => Some(ImageSize::Px252),
            300 => Some(ImageSize::Px300),
            _ => None,
        }
    }

    pub fn px(self) -> u32 {
        match self {
            ImageSize::Px34 => 34,
            ImageSize::Px64 => 64,
            ImageSize::Px126 => 126,
            ImageSize::Px252 => 252,
            ImageSize::Px300 => 300,
        }
    }

    /// Position in the size set; the `code % 10` half of the combined code.
    pub fn index(self) -> u64 {
        match self {
            ImageSize::Px34 => 0,
            ImageSize::Px64 => 1,
            ImageSize::Px126 => 2,
            ImageSize::Px252 => 3,
            ImageSize::Px300 => 4,
        }
    }

    pub fn from_index(index: u64) -> Option<Self> {
        match index {
            0 => Some(ImageSize::Px34),
            1 => Some(ImageSize::Px64),
            2 => Some(ImageSize::Px126),
            3 => Some(ImageSize::Px252),
            4 => Some(ImageSize::Px300),
            _ => None,
        }
    }
}

/// Image file formats the service serves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Png,
    Jpg,
    Jpeg,
    Gif,
}

impl ImageKind {
    pub fn from_ext(ext: &str) -> Option<Self> {
        match ext {
            "png" => Some(ImageKind::Png),
            "jpg" => Some(ImageKind::Jpg),
            "jpeg" => Some(ImageKind::Jpeg),
            "gif" => Some(ImageKind::Gif),
            _ => None,
        }
    }

    pub fn ext(self) -> &'static str {
        match self {
            ImageKind::Png => "png",
            ImageKind::Jpg => "jpg",
            ImageKind::Jpeg => "jpeg",
            ImageKind::Gif => "gif",
        }
    }

    /// The `code - code % 10` half of the combined size/format code.
    pub fn code(self) -> u64 {
        match self {
            ImageKind::Png => 0,
            ImageKind::Jpg => 10,
            ImageKind::Jpeg => 20,
            ImageKind::Gif => 30,
        }
    }

    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(ImageKind::Png),
            10 => Some(ImageKind::Jpg),
            20 => Some(ImageKind::Jpeg),
            30 => Some(ImageKind::Gif),
            _ => None,
        }
    }
}
