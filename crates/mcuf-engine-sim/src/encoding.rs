//! The simulated bitmap-font encoding
//!
//! A short text record standing in for the real converter's data file:
//!
//! ```text
//! mcuf-sim 1
//! size 14
//! mono 1
//! passes 000000
//! digest 9f2c4e8a01b7d3f6
//! widths 4,8,9,...
//! ```
//!
//! Widths cover printable ASCII. The passes field has a fixed width, so an
//! optimization pass rewrites the record in place without changing its length.

pub(crate) const MAGIC: &str = "mcuf-sim 1";
const FIRST_CHAR: u32 = 32;
const LAST_CHAR: u32 = 126;
const MAX_PASSES: u32 = 999_999;

/// TrueType and Apple `true` sfnt versions
const TTF_MAGICS: [[u8; 4]; 2] = [[0, 1, 0, 0], *b"true"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SimFont {
    pub(crate) size: u32,
    pub(crate) monochrome: bool,
    pub(crate) passes: u32,
    pub(crate) digest: u64,
    widths: Vec<u8>,
}

impl SimFont {
    /// Derive a font from raw TTF bytes; `None` unless they start like a TrueType file
    pub(crate) fn from_ttf(ttf: &[u8], size: u32, monochrome: bool) -> Option<Self> {
        if size == 0 || !TTF_MAGICS.iter().any(|magic| ttf.starts_with(magic)) {
            return None;
        }
        let digest = fnv1a(ttf);
        let base = (size * 3 / 5).max(1);
        let widths = (FIRST_CHAR..=LAST_CHAR)
            .map(|c| {
                if c == FIRST_CHAR {
                    return (size / 3).clamp(1, 255) as u8;
                }
                let jitter = ((digest >> ((c * 7) % 61)) & 3) as u32;
                (base + jitter).clamp(1, 255) as u8
            })
            .collect();
        Some(Self {
            size,
            monochrome,
            passes: 0,
            digest,
            widths,
        })
    }

    pub(crate) fn parse(bytes: &[u8]) -> Option<Self> {
        let text = std::str::from_utf8(bytes).ok()?;
        let mut lines = text.lines();
        if lines.next()? != MAGIC {
            return None;
        }
        let mut field = |name: &str| {
            lines
                .next()
                .and_then(|line| line.strip_prefix(name))
                .and_then(|rest| rest.strip_prefix(' '))
                .map(str::to_string)
        };
        let size = field("size")?.parse().ok()?;
        let monochrome = field("mono")? == "1";
        let passes = field("passes")?.parse().ok()?;
        let digest = u64::from_str_radix(&field("digest")?, 16).ok()?;
        let widths = field("widths")?
            .split(',')
            .map(|w| w.parse().ok())
            .collect::<Option<Vec<u8>>>()?;
        if widths.len() != (LAST_CHAR - FIRST_CHAR + 1) as usize {
            return None;
        }
        Some(Self {
            size,
            monochrome,
            passes,
            digest,
            widths,
        })
    }

    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        let widths: Vec<String> = self.widths.iter().map(u8::to_string).collect();
        format!(
            "{MAGIC}\nsize {}\nmono {}\npasses {:06}\ndigest {:016x}\nwidths {}\n",
            self.size,
            u8::from(self.monochrome),
            self.passes.min(MAX_PASSES),
            self.digest,
            widths.join(",")
        )
        .into_bytes()
    }

    /// Record `iterations` more optimization passes
    pub(crate) fn optimize(&mut self, iterations: u32) {
        self.passes = self
            .passes
            .saturating_add(iterations.max(1))
            .min(MAX_PASSES);
    }

    pub(crate) fn line_height(&self) -> u32 {
        self.size
    }

    /// Horizontal advance; unmapped characters take the width of `?`
    pub(crate) fn advance(&self, ch: char) -> u32 {
        let code = ch as u32;
        let index = if (FIRST_CHAR..=LAST_CHAR).contains(&code) {
            code - FIRST_CHAR
        } else {
            '?' as u32 - FIRST_CHAR
        };
        u32::from(self.widths[index as usize])
    }

    /// Ink value for glyph pixels
    pub(crate) fn ink(&self) -> u8 {
        if self.monochrome {
            0
        } else {
            96
        }
    }

    pub(crate) fn widths(&self) -> &[u8] {
        &self.widths
    }
}

/// Greedy word wrap into lines no wider than `max_width`
///
/// Explicit newlines always break. A word wider than the line sits on its own
/// line and is clipped when drawn.
pub(crate) fn wrap(font: &SimFont, text: &str, max_width: u32) -> Vec<String> {
    let mut lines = Vec::new();
    if text.is_empty() {
        return lines;
    }
    let width_of = |s: &str| s.chars().map(|c| font.advance(c)).sum::<u32>();

    for paragraph in text.split('\n') {
        let mut line = String::new();
        for word in paragraph.split(' ') {
            let candidate = if line.is_empty() {
                word.to_string()
            } else {
                format!("{line} {word}")
            };
            if line.is_empty() || width_of(&candidate) <= max_width {
                line = candidate;
            } else {
                lines.push(std::mem::take(&mut line));
                line = word.to_string();
            }
        }
        lines.push(line);
    }
    lines
}

/// FNV-1a, 64 bit
fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(0x0100_0000_01b3)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ttf() -> Vec<u8> {
        let mut bytes = vec![0, 1, 0, 0];
        bytes.extend((0..200u32).map(|i| (i * 31 % 251) as u8));
        bytes
    }

    #[test]
    fn test_rejects_non_truetype() {
        assert!(SimFont::from_ttf(b"OTTO....", 14, true).is_none());
        assert!(SimFont::from_ttf(&[], 14, true).is_none());
        assert!(SimFont::from_ttf(&ttf(), 0, true).is_none());
        assert!(SimFont::from_ttf(b"true....", 14, true).is_some());
    }

    #[test]
    fn test_encoding_is_deterministic_and_parses_back() {
        let a = SimFont::from_ttf(&ttf(), 14, true).unwrap();
        let b = SimFont::from_ttf(&ttf(), 14, true).unwrap();
        assert_eq!(a.to_bytes(), b.to_bytes());
        assert!(a.to_bytes().starts_with(MAGIC.as_bytes()));
        assert_eq!(SimFont::parse(&a.to_bytes()), Some(a));
    }

    #[test]
    fn test_record_layout() {
        let font = SimFont::from_ttf(&ttf(), 9, false).unwrap();
        let text = String::from_utf8(font.to_bytes()).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], MAGIC);
        assert_eq!(lines[1], "size 9");
        assert_eq!(lines[2], "mono 0");
        assert_eq!(lines[3], "passes 000000");
        assert_eq!(lines[4].len(), "digest ".len() + 16);
        assert_eq!(lines[5].split(',').count(), 95);
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_optimize_keeps_length() {
        let mut font = SimFont::from_ttf(&ttf(), 14, false).unwrap();
        let before = font.to_bytes();
        font.optimize(50);
        let after = font.to_bytes();

        assert_eq!(before.len(), after.len());
        assert_ne!(before, after);
        assert_eq!(SimFont::parse(&after).unwrap().passes, 50);

        font.optimize(u32::MAX);
        assert_eq!(font.to_bytes().len(), before.len());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(SimFont::parse(b"").is_none());
        assert!(SimFont::parse(b"mcuf-sim 1\nsize x\n").is_none());
        assert!(SimFont::parse(&[0xff, 0xfe]).is_none());
    }

    #[test]
    fn test_wrap() {
        let font = SimFont::from_ttf(&ttf(), 10, true).unwrap();
        assert!(wrap(&font, "", 100).is_empty());
        assert_eq!(wrap(&font, "Abc1230", 1000), vec!["Abc1230"]);
        assert_eq!(wrap(&font, "ab\ncd", 1000), vec!["ab", "cd"]);

        let narrow = wrap(&font, "aa bb cc", 2 * font.advance('a'));
        assert_eq!(narrow, vec!["aa", "bb", "cc"]);
    }
}
