//! Numbered filename patterns.
//!
//! A sequence file carries its frame number at the end of the file stem:
//! `name_0012.xmesh`, `name_-0003.xmesh` for negative frames and
//! `name_0012,5.xmesh` for subframes. A pattern can also be written with
//! hashes in place of the digits, `name_####.xmesh`.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::util::{Error, Frame, Result};

/// Subframes are stored to a millionth of a frame.
const SUBFRAME_DIGITS: usize = 6;

/// Directory, prefix, padding and extension of a numbered file sequence.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FilenamePattern {
    dir: PathBuf,
    prefix: String,
    padding: usize,
    extension: String,
}

impl FilenamePattern {
    /// Parse the pattern of the sequence `path` belongs to.
    ///
    /// `path` may name any member of the sequence or use `#` placeholders.
    pub fn parse(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let invalid = || Error::InvalidPattern(path.display().to_string());

        let file_name = path.file_name().and_then(|n| n.to_str()).ok_or_else(invalid)?;
        let (stem, extension) = match file_name.rfind('.') {
            Some(dot) if dot > 0 => (&file_name[..dot], &file_name[dot..]),
            _ => (file_name, ""),
        };

        let hashes = stem.len() - stem.trim_end_matches('#').len();
        let (prefix, padding) = if hashes > 0 {
            (&stem[..stem.len() - hashes], hashes)
        } else {
            let number = match stem.rfind(',') {
                Some(comma) if is_digits(&stem[comma + 1..]) => &stem[..comma],
                _ => stem,
            };
            let digits = number.len() - number.trim_end_matches(|c: char| c.is_ascii_digit()).len();
            if digits == 0 {
                return Err(invalid());
            }
            let mut prefix = &number[..number.len() - digits];
            if let Some(unsigned) = prefix.strip_suffix('-') {
                if is_sign_position(unsigned) {
                    prefix = unsigned;
                }
            }
            (prefix, digits)
        };

        Ok(Self {
            dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
            prefix: prefix.to_string(),
            padding,
            extension: extension.to_string(),
        })
    }

    /// Directory holding the sequence files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Directory to scan; the working directory for bare file names.
    pub fn scan_dir(&self) -> &Path {
        if self.dir.as_os_str().is_empty() {
            Path::new(".")
        } else {
            &self.dir
        }
    }

    /// Filename text before the frame number.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Minimum number of digits of the whole frame number.
    pub fn padding(&self) -> usize {
        self.padding
    }

    /// Extension including the leading dot, or empty.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Path of the file holding `frame`.
    pub fn filename_for(&self, frame: Frame) -> PathBuf {
        let name = format!("{}{}{}", self.prefix, self.format_frame(frame), self.extension);
        self.dir.join(name)
    }

    /// Pattern path with `#` placeholders.
    pub fn hashed_path(&self) -> PathBuf {
        let name = format!("{}{}{}", self.prefix, "#".repeat(self.padding), self.extension);
        self.dir.join(name)
    }

    /// Frame number encoded in `file_name`, if it belongs to this sequence.
    pub fn frame_of(&self, file_name: &str) -> Option<Frame> {
        let rest = file_name.strip_prefix(self.prefix.as_str())?;
        let split = rest.len().checked_sub(self.extension.len())?;
        if !rest.is_char_boundary(split) || !rest[split..].eq_ignore_ascii_case(&self.extension) {
            return None;
        }
        parse_frame(&rest[..split])
    }

    /// Pattern of the automatically derived proxy sequence.
    ///
    /// The proxy files live in a sibling directory named after the prefix:
    /// `<dir>/<prefix>_proxy/<prefix>_proxy####<ext>`.
    pub fn auto_proxy(&self) -> Self {
        let prefix = format!("{}_proxy", self.prefix);
        Self {
            dir: self.dir.join(&prefix),
            prefix,
            padding: self.padding,
            extension: self.extension.clone(),
        }
    }

    fn format_frame(&self, frame: Frame) -> String {
        let sign = if frame < 0.0 { "-" } else { "" };
        let magnitude = frame.abs();
        let mut whole = magnitude.trunc() as u64;
        let scale = 10u64.pow(SUBFRAME_DIGITS as u32);
        let mut frac = ((magnitude - magnitude.trunc()) * scale as f64).round() as u64;
        if frac >= scale {
            whole += 1;
            frac = 0;
        }
        let mut out = format!("{sign}{whole:0width$}", width = self.padding);
        if frac > 0 {
            let digits = format!("{frac:0width$}", width = SUBFRAME_DIGITS);
            out.push(',');
            out.push_str(digits.trim_end_matches('0'));
        }
        out
    }
}

impl fmt::Display for FilenamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hashed_path().display())
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// A `-` counts as a sign at the start of the stem or after a non-alphanumeric.
fn is_sign_position(before: &str) -> bool {
    before.chars().next_back().map_or(true, |c| !c.is_alphanumeric())
}

/// Parse `0012`, `-0003` or `0012,5`.
fn parse_frame(token: &str) -> Option<Frame> {
    let (negative, token) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token),
    };
    let (whole, frac) = match token.split_once(',') {
        Some((w, f)) => (w, Some(f)),
        None => (token, None),
    };
    if !is_digits(whole) {
        return None;
    }
    let mut value = whole.parse::<u64>().ok()? as Frame;
    if let Some(frac) = frac {
        if !is_digits(frac) {
            return None;
        }
        value += format!("0.{frac}").parse::<Frame>().ok()?;
    }
    Some(if negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numbered() {
        let p = FilenamePattern::parse("/cache/shot/name_0012.xmesh").unwrap();
        assert_eq!(p.dir(), Path::new("/cache/shot"));
        assert_eq!(p.prefix(), "name_");
        assert_eq!(p.padding(), 4);
        assert_eq!(p.extension(), ".xmesh");
        assert_eq!(p.hashed_path(), PathBuf::from("/cache/shot/name_####.xmesh"));
    }

    #[test]
    fn test_parse_hashes_negative_and_subframe() {
        let hashed = FilenamePattern::parse("name_####.xmesh").unwrap();
        assert_eq!(hashed.prefix(), "name_");
        assert_eq!(hashed.padding(), 4);

        assert_eq!(FilenamePattern::parse("name_-0003.xmesh").unwrap(), hashed);
        assert_eq!(FilenamePattern::parse("name_0012,5.xmesh").unwrap(), hashed);

        // A dash glued to letters is part of the prefix
        let dashed = FilenamePattern::parse("take-0003.xmesh").unwrap();
        assert_eq!(dashed.prefix(), "take-");
    }

    #[test]
    fn test_parse_rejects_unnumbered() {
        assert!(matches!(
            FilenamePattern::parse("mesh.xmesh"),
            Err(Error::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_filename_for() {
        let p = FilenamePattern::parse("seq/name_####.xmesh").unwrap();
        assert_eq!(p.filename_for(12.0), PathBuf::from("seq/name_0012.xmesh"));
        assert_eq!(p.filename_for(-3.0), PathBuf::from("seq/name_-0003.xmesh"));
        assert_eq!(p.filename_for(12.5), PathBuf::from("seq/name_0012,5.xmesh"));
        assert_eq!(p.filename_for(12.25), PathBuf::from("seq/name_0012,25.xmesh"));
        assert_eq!(p.filename_for(123456.0), PathBuf::from("seq/name_123456.xmesh"));
    }

    #[test]
    fn test_frame_of() {
        let p = FilenamePattern::parse("name_####.xmesh").unwrap();
        assert_eq!(p.frame_of("name_0012.xmesh"), Some(12.0));
        assert_eq!(p.frame_of("name_-0003.xmesh"), Some(-3.0));
        assert_eq!(p.frame_of("name_0012,5.xmesh"), Some(12.5));
        assert_eq!(p.frame_of("name_0012.XMESH"), Some(12.0));
        assert_eq!(p.frame_of("name_0012.obj"), None);
        assert_eq!(p.frame_of("other_0012.xmesh"), None);
        assert_eq!(p.frame_of("name_12a.xmesh"), None);

        for frame in [0.0, 7.0, -12.5, 3.125] {
            let path = p.filename_for(frame);
            let name = path.file_name().unwrap().to_str().unwrap();
            assert_eq!(p.frame_of(name), Some(frame));
        }
    }

    #[test]
    fn test_auto_proxy() {
        let p = FilenamePattern::parse("/cache/shot/name_0001.xmesh").unwrap();
        let proxy = p.auto_proxy();
        assert_eq!(
            proxy.filename_for(7.0),
            PathBuf::from("/cache/shot/name__proxy/name__proxy0007.xmesh")
        );
    }
}
