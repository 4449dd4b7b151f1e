//! Bijective integer <-> glyph-string codec.
//!
//! Every numeric field in the persisted table formats is a fixed-width string
//! of glyphs over a contiguous alphabet of [`ALPHABET_SIZE`] code points.
//! Using a large alphabet keeps the encoded strings short enough to fit the
//! per-key size limits of the backing store.

/// Number of distinct glyphs. A 2-glyph field covers ids up to
/// `ALPHABET_SIZE^2 - 1`.
pub const ALPHABET_SIZE: u64 = 10_240;

/// First code point of the alphabet. Starts above the ASCII and Latin-1
/// ranges so no glyph collides with the `'\n'` record delimiter, and the
/// highest glyph (`0x28FF`) stays well below the surrogate range.
const GLYPH_BASE: u32 = 0x100;

#[derive(Debug, PartialEq, Eq)]
pub enum CodecError {
    /// Decode input was empty.
    Empty,
    /// A character outside the glyph alphabet.
    ForeignGlyph(char),
    /// The natural representation of `value` needs more than `width` glyphs.
    WidthOverflow { value: u64, width: usize },
    /// Decode input represents a value larger than `u64`.
    TooLarge,
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::Empty => write!(f, "empty glyph string"),
            CodecError::ForeignGlyph(ch) => {
                write!(f, "character {:?} is not in the glyph alphabet", ch)
            }
            CodecError::WidthOverflow { value, width } => {
                write!(f, "value {} does not fit in {} glyph(s)", value, width)
            }
            CodecError::TooLarge => write!(f, "glyph string overflows u64"),
        }
    }
}

impl std::error::Error for CodecError {}

fn glyph(digit: u64) -> char {
    debug_assert!(digit < ALPHABET_SIZE);
    // Base and size are chosen so every value in range is a valid scalar.
    char::from_u32(GLYPH_BASE + digit as u32).expect("glyph alphabet within valid code points")
}

fn digit(ch: char) -> Result<u64, CodecError> {
    let value = (ch as u32).wrapping_sub(GLYPH_BASE) as u64;
    if (ch as u32) < GLYPH_BASE || value >= ALPHABET_SIZE {
        return Err(CodecError::ForeignGlyph(ch));
    }
    Ok(value)
}

/// Number of glyphs in the natural (unpadded) representation of `value`.
pub fn width(value: u64) -> usize {
    let mut len = 1;
    let mut rest = value / ALPHABET_SIZE;
    while rest > 0 {
        len += 1;
        rest /= ALPHABET_SIZE;
    }
    len
}

/// Encode `value` at its natural width, most significant glyph first.
pub fn encode(value: u64) -> String {
    let mut out = vec![glyph(0); width(value)];
    let mut rest = value;
    for slot in out.iter_mut().rev() {
        *slot = glyph(rest % ALPHABET_SIZE);
        rest /= ALPHABET_SIZE;
    }
    out.into_iter().collect()
}

/// Encode `value` left-padded with the zero glyph to exactly `width` glyphs.
///
/// Fails when the natural representation is longer than `width`; fields are
/// positional, so a silent overflow would corrupt everything framed after it.
pub fn encode_fixed(value: u64, width: usize) -> Result<String, CodecError> {
    let natural = self::width(value);
    if natural > width {
        return Err(CodecError::WidthOverflow { value, width });
    }
    let mut out = String::with_capacity(width);
    for _ in natural..width {
        out.push(glyph(0));
    }
    out.push_str(&encode(value));
    Ok(out)
}

/// Decode a glyph string, most significant glyph first. Inverse of
/// [`encode_fixed`] for any width at least the natural width of the value.
pub fn decode(text: &str) -> Result<u64, CodecError> {
    if text.is_empty() {
        return Err(CodecError::Empty);
    }
    let mut value: u64 = 0;
    for ch in text.chars() {
        let d = digit(ch)?;
        value = value
            .checked_mul(ALPHABET_SIZE)
            .and_then(|v| v.checked_add(d))
            .ok_or(CodecError::TooLarge)?;
    }
    Ok(value)
}
