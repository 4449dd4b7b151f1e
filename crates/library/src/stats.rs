use std::collections::BTreeMap;

use codec::CodecError;

use crate::error::{CompressError, DecompressError, ValidationError};
use crate::persist::Compact;

const ID_WIDTH: usize = 2;
/// 2-glyph track id plus 1-glyph play count.
const PAIR_WIDTH: usize = 3;

/// Highest play count the 1-glyph field carries. The persisted format
/// inherited a single-decimal-digit ceiling; counts above it are an explicit
/// compress error rather than being truncated into the field.
pub const PLAY_COUNT_MAX: u32 = 9;

/// One user's listening history: play counts nested year -> month -> track
/// id, plus the loved-track list in insertion order. Track ids reference the
/// track table.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UserStats {
    stats: BTreeMap<u16, BTreeMap<u8, BTreeMap<u32, u32>>>,
    loved: Vec<u32>,
}

impl UserStats {
    /// Add `plays` to the count for `track` in the given month.
    pub fn record_play(
        &mut self,
        year: u16,
        month: u8,
        track: u32,
        plays: u32,
    ) -> Result<(), ValidationError> {
        if !(1..=12).contains(&month) {
            return Err(ValidationError::InvalidMonth(month));
        }
        let slot = self
            .stats
            .entry(year)
            .or_default()
            .entry(month)
            .or_default()
            .entry(track)
            .or_insert(0);
        *slot = slot.saturating_add(plays);
        Ok(())
    }

    /// Append `track` to the loved list if it is not already there.
    pub fn love(&mut self, track: u32) {
        if !self.loved.contains(&track) {
            self.loved.push(track);
        }
    }

    pub fn loved(&self) -> &[u32] {
        &self.loved
    }

    pub fn plays(&self, year: u16, month: u8, track: u32) -> u32 {
        self.stats
            .get(&year)
            .and_then(|months| months.get(&month))
            .and_then(|plays| plays.get(&track))
            .copied()
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.loved.is_empty() && self.stats.values().flat_map(|m| m.values()).all(|p| p.is_empty())
    }

    /// Every track id this user references, loved list included.
    pub(crate) fn track_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.loved.iter().copied().chain(
            self.stats
                .values()
                .flat_map(|months| months.values())
                .flat_map(|plays| plays.keys().copied()),
        )
    }
}

impl Compact for UserStats {
    /// Line 0 carries the loved list as concatenated 2-glyph ids. Each
    /// following block is one year: a natural-width year line, then one line
    /// per month holding a 1-glyph month code and concatenated
    /// `(track id, count)` pairs. Empty months and years are skipped.
    fn compress(&self) -> Result<String, CompressError> {
        let width_err = |field: &'static str, id: u32, err: CodecError| match err {
            CodecError::WidthOverflow { value, .. } => CompressError::Width {
                table: "stats",
                field,
                id,
                value,
            },
            other => unreachable!("unexpected codec error: {}", other),
        };

        let mut loved_line = String::with_capacity(self.loved.len() * ID_WIDTH);
        for &track in &self.loved {
            loved_line.push_str(
                &codec::encode_fixed(track as u64, ID_WIDTH)
                    .map_err(|err| width_err("loved track id", track, err))?,
            );
        }
        let mut lines = vec![loved_line];

        for (&year, months) in &self.stats {
            if months.values().all(|plays| plays.is_empty()) {
                continue;
            }
            lines.push(codec::encode(year as u64));
            for (&month, plays) in months {
                if plays.is_empty() {
                    continue;
                }
                // months are 1..=12, always a single glyph
                let mut line = codec::encode(month as u64);
                for (&track, &count) in plays {
                    if count > PLAY_COUNT_MAX {
                        return Err(CompressError::PlayCount {
                            year,
                            month,
                            track,
                            count,
                        });
                    }
                    line.push_str(
                        &codec::encode_fixed(track as u64, ID_WIDTH)
                            .map_err(|err| width_err("track id", track, err))?,
                    );
                    line.push_str(&codec::encode(count as u64));
                }
                lines.push(line);
            }
        }
        Ok(lines.join("\n"))
    }

    /// A line shorter than one month pair (4 glyphs) after the loved line is
    /// a year header; anything else is a month line under the current year.
    fn decompress(&mut self, text: &str) -> Result<(), DecompressError> {
        let mut loved = Vec::new();
        let mut stats: BTreeMap<u16, BTreeMap<u8, BTreeMap<u32, u32>>> = BTreeMap::new();

        if !text.is_empty() {
            let mut lines = text.split('\n');
            let loved_chars: Vec<char> = lines.next().unwrap_or("").chars().collect();
            if loved_chars.len() % ID_WIDTH != 0 {
                return Err(DecompressError::BadLength {
                    table: "stats",
                    len: loved_chars.len(),
                    unit: ID_WIDTH,
                });
            }
            for code in loved_chars.chunks(ID_WIDTH) {
                loved.push(decode_chunk(code)? as u32);
            }

            let mut current_year: Option<u16> = None;
            for line in lines {
                let chars: Vec<char> = line.chars().collect();
                if chars.len() < 1 + PAIR_WIDTH {
                    let year = codec::decode(line)?;
                    if year > u16::MAX as u64 {
                        return Err(DecompressError::BadYear(year));
                    }
                    current_year = Some(year as u16);
                    continue;
                }
                let year = current_year.ok_or(DecompressError::OrphanMonthLine)?;
                if (chars.len() - 1) % PAIR_WIDTH != 0 {
                    return Err(DecompressError::BadLength {
                        table: "stats",
                        len: chars.len() - 1,
                        unit: PAIR_WIDTH,
                    });
                }
                let month_code = decode_chunk(&chars[..1])?;
                if !(1..=12).contains(&month_code) {
                    return Err(DecompressError::BadMonth(month_code));
                }
                let plays = stats
                    .entry(year)
                    .or_default()
                    .entry(month_code as u8)
                    .or_default();
                for pair in chars[1..].chunks(PAIR_WIDTH) {
                    let track = decode_chunk(&pair[..ID_WIDTH])? as u32;
                    let count = decode_chunk(&pair[ID_WIDTH..])? as u32;
                    plays.insert(track, count);
                }
            }
        }

        self.stats = stats;
        self.loved = loved;
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

    #[test]
    fn round_trips_plays_and_loved() {
        let mut stats = UserStats::default();
        stats.record_play(2020, 3, 5, 2).unwrap();
        stats.love(7);
        stats.love(9);

        let text = stats.compress().unwrap();
        let mut restored = UserStats::default();
        restored.decompress(&text).unwrap();
        assert_eq!(restored, stats);
        assert_eq!(restored.plays(2020, 3, 5), 2);
        assert_eq!(restored.loved(), &[7, 9]);
    }

    #[test]
    fn round_trips_multiple_years_and_months() {
        let mut stats = UserStats::default();
        stats.record_play(2019, 12, 1, 4).unwrap();
        stats.record_play(2020, 1, 1, 1).unwrap();
        stats.record_play(2020, 1, 2, 9).unwrap();
        stats.record_play(2020, 11, 300, 3).unwrap();
        stats.love(1);

        let text = stats.compress().unwrap();
        let mut restored = UserStats::default();
        restored.decompress(&text).unwrap();
        assert_eq!(restored, stats);
        assert_eq!(restored.plays(2020, 1, 2), 9);
        assert_eq!(restored.plays(2020, 11, 300), 3);
        assert_eq!(restored.plays(2021, 1, 1), 0);
    }

    #[test]
    fn play_count_above_capacity_fails_at_compress() {
        let mut stats = UserStats::default();
        stats.record_play(2020, 3, 5, 10).unwrap();
        assert_eq!(
            stats.compress(),
            Err(CompressError::PlayCount {
                year: 2020,
                month: 3,
                track: 5,
                count: 10,
            })
        );
    }

    #[test]
    fn plays_accumulate_per_month() {
        let mut stats = UserStats::default();
        stats.record_play(2021, 6, 8, 2).unwrap();
        stats.record_play(2021, 6, 8, 3).unwrap();
        assert_eq!(stats.plays(2021, 6, 8), 5);
    }

    #[test]
    fn rejects_out_of_range_months() {
        let mut stats = UserStats::default();
        assert_eq!(
            stats.record_play(2020, 0, 1, 1),
            Err(ValidationError::InvalidMonth(0))
        );
        assert_eq!(
            stats.record_play(2020, 13, 1, 1),
            Err(ValidationError::InvalidMonth(13))
        );
        assert!(stats.is_empty());
    }

    #[test]
    fn love_is_idempotent_and_ordered() {
        let mut stats = UserStats::default();
        stats.love(9);
        stats.love(7);
        stats.love(9);
        assert_eq!(stats.loved(), &[9, 7]);
    }

    #[test]
    fn empty_stats_round_trip() {
        let stats = UserStats::default();
        assert_eq!(stats.compress().unwrap(), "");
        let mut restored = UserStats::default();
        restored.decompress("").unwrap();
        assert!(restored.is_empty());
    }

    #[test]
    fn month_line_before_year_header_is_rejected() {
        // loved line, then a month-shaped line with no preceding year
        let mut text = String::new();
        text.push('\n');
        text.push_str(&codec::encode(1));
        text.push_str(&codec::encode_fixed(5, 2).unwrap());
        text.push_str(&codec::encode(2));
        let mut stats = UserStats::default();
        assert_eq!(
            stats.decompress(&text),
            Err(DecompressError::OrphanMonthLine)
        );
    }

    #[test]
    fn ragged_month_line_is_a_framing_error() {
        let mut stats = UserStats::default();
        stats.record_play(2020, 3, 5, 2).unwrap();
        stats.record_play(2020, 3, 6, 1).unwrap();
        let mut text = stats.compress().unwrap();
        text.pop();
        let mut restored = UserStats::default();
        assert_eq!(
            restored.decompress(&text),
            Err(DecompressError::BadLength {
                table: "stats",
                len: 5,
                unit: 3,
            })
        );
    }
}
