//! Release tag names: `v<major>.<minor>.<patch>____<seq>`
//!
//! The sequence is a flat counter appended to a version the user controls.
//! Incrementing never rolls over into patch, minor or major.

use crate::error::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;

static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^v(\d+)\.(\d+)\.(\d+)____(\d{4,})$").expect("release tag pattern is valid")
});

/// Separator between version and sequence
const SEQ_SEPARATOR: &str = "____";

/// Minimum width of the zero-padded sequence
const SEQ_WIDTH: usize = 4;

/// A well-formed release tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseTag {
    /// Tag name as stored on the host
    pub name: String,
    /// Major version
    pub major: u64,
    /// Minor version
    pub minor: u64,
    /// Patch version
    pub patch: u64,
    /// Sequence number
    pub seq: u64,
}

impl ReleaseTag {
    /// Parse a tag name; `Ok(None)` if it does not match the release pattern.
    ///
    /// A matching name with a component too large to order is an error,
    /// since skipping it could hand out a name that sorts below it.
    pub fn parse(name: &str) -> Result<Option<Self>> {
        let Some(caps) = TAG_PATTERN.captures(name) else {
            return Ok(None);
        };
        let num = |i: usize| {
            caps.get(i)
                .map_or("", |m| m.as_str())
                .parse::<u64>()
                .map_err(|e| Error::Internal(format!("release tag {name} out of range: {e}")))
        };

        Ok(Some(Self {
            name: name.to_string(),
            major: num(1)?,
            minor: num(2)?,
            patch: num(3)?,
            seq: num(4)?,
        }))
    }

    /// First tag of a new series: `v1.0.0____0001`
    pub fn first() -> Self {
        Self::build(1, 0, 0, 1)
    }

    fn build(major: u64, minor: u64, patch: u64, seq: u64) -> Self {
        Self {
            name: format!(
                "v{major}.{minor}.{patch}{SEQ_SEPARATOR}{seq:0width$}",
                width = SEQ_WIDTH
            ),
            major,
            minor,
            patch,
            seq,
        }
    }

    /// Ordering key: major, minor, patch, then sequence (all numeric)
    pub const fn sort_key(&self) -> (u64, u64, u64, u64) {
        (self.major, self.minor, self.patch, self.seq)
    }

    /// Same version with the sequence incremented
    pub fn next(&self) -> Result<Self> {
        let seq = self
            .seq
            .checked_add(1)
            .ok_or_else(|| Error::Internal(format!("sequence overflow after {}", self.name)))?;
        Ok(Self::build(self.major, self.minor, self.patch, seq))
    }
}

impl std::fmt::Display for ReleaseTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Whether a name is a well-formed release tag
pub fn is_release_tag(name: &str) -> bool {
    TAG_PATTERN.is_match(name)
}

/// Latest well-formed tag among `names`, ignoring everything else.
///
/// Two tags with the same version and sequence at the top of the series
/// (e.g. `____0007` and `____00007`) are reported as `DuplicateTag`.
pub fn latest_release_tag<S: AsRef<str>>(names: &[S]) -> Result<Option<ReleaseTag>> {
    let mut valid: Vec<ReleaseTag> = names
        .iter()
        .filter_map(|n| ReleaseTag::parse(n.as_ref()).transpose())
        .collect::<Result<_>>()?;
    valid.sort_by_key(ReleaseTag::sort_key);

    let Some(latest) = valid.pop() else {
        return Ok(None);
    };
    if valid.last().is_some_and(|t| t.sort_key() == latest.sort_key()) {
        return Err(Error::DuplicateTag(latest.name));
    }
    Ok(Some(latest))
}

/// Next tag name after the latest well-formed tag in `names`.
pub fn next_tag_name<S: AsRef<str>>(names: &[S]) -> Result<String> {
    match latest_release_tag(names)? {
        Some(latest) => Ok(latest.next()?.name),
        None => Ok(ReleaseTag::first().name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let tag = ReleaseTag::parse("v1.12.3____0042").unwrap().unwrap();
        assert_eq!(tag.sort_key(), (1, 12, 3, 42));
        assert_eq!(tag.to_string(), "v1.12.3____0042");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for name in [
            "1.2.3____0001",
            "v1.2____0001",
            "v1.2.3___0001",
            "v1.2.3____001",
            "v1.2.3____0001-rc",
            "release-1",
            "v1.2.3",
            "",
        ] {
            assert!(ReleaseTag::parse(name).unwrap().is_none(), "{name}");
        }
    }

    #[test]
    fn test_parse_accepts_wide_sequence() {
        assert_eq!(ReleaseTag::parse("v1.0.0____12345").unwrap().unwrap().seq, 12345);
    }

    #[test]
    fn test_out_of_range_component_is_error() {
        let huge = "v1.0.0____99999999999999999999999";
        assert!(is_release_tag(huge));
        assert!(matches!(ReleaseTag::parse(huge), Err(Error::Internal(_))));

        let names = ["v1.0.0____0002", huge];
        assert!(matches!(next_tag_name(&names), Err(Error::Internal(_))));
    }

    #[test]
    fn test_next_from_mixed_set() {
        let names = ["v1.2.0____0001", "v1.2.0____0002", "v1.1.9____0099"];
        assert_eq!(next_tag_name(&names).unwrap(), "v1.2.0____0003");
    }

    #[test]
    fn test_empty_set_starts_series() {
        let names: [&str; 0] = [];
        assert_eq!(next_tag_name(&names).unwrap(), "v1.0.0____0001");
    }

    #[test]
    fn test_all_invalid_starts_series() {
        let names = ["latest", "v2.0.0", "build-17"];
        assert_eq!(next_tag_name(&names).unwrap(), "v1.0.0____0001");
    }

    #[test]
    fn test_invalid_names_ignored() {
        let names = ["v9.9.9", "v1.0.0____0003", "v10.0.0____1-bad"];
        assert_eq!(next_tag_name(&names).unwrap(), "v1.0.0____0004");
    }

    #[test]
    fn test_numeric_not_lexicographic_ordering() {
        let names = ["v1.10.0____0001", "v1.9.0____0050", "v1.2.10____0001"];
        assert_eq!(next_tag_name(&names).unwrap(), "v1.10.0____0002");
    }

    #[test]
    fn test_sequence_tiebreak_is_numeric() {
        let names = ["v1.0.0____0999", "v1.0.0____10000", "v1.0.0____1000"];
        assert_eq!(next_tag_name(&names).unwrap(), "v1.0.0____10001");
    }

    #[test]
    fn test_sequence_never_rolls_over() {
        let names = ["v3.4.5____9999"];
        assert_eq!(next_tag_name(&names).unwrap(), "v3.4.5____10000");
    }

    #[test]
    fn test_next_is_greater_than_every_input() {
        let names = [
            "v0.1.0____0001",
            "v2.0.0____0003",
            "v2.0.0____0010",
            "v1.99.99____9999",
        ];
        let next = ReleaseTag::parse(&next_tag_name(&names).unwrap()).unwrap().unwrap();
        for name in names {
            let tag = ReleaseTag::parse(name).unwrap().unwrap();
            assert!(next.sort_key() > tag.sort_key(), "{next} <= {tag}");
        }
    }

    #[test]
    fn test_duplicate_at_top_is_error() {
        let names = ["v1.0.0____0007", "v1.0.0____00007", "v0.9.0____0001"];
        assert!(matches!(next_tag_name(&names), Err(Error::DuplicateTag(_))));
    }

    #[test]
    fn test_duplicate_below_top_is_ignored() {
        let names = ["v1.0.0____0007", "v1.0.0____00007", "v1.0.1____0001"];
        assert_eq!(next_tag_name(&names).unwrap(), "v1.0.1____0002");
    }
}
