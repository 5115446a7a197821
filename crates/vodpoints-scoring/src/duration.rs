//! Compact VOD duration parsing (`5h20m3s`).
//!
//! Grammar: `[<digits>h][<digits>m][<digits>s]`, each component optional,
//! in that order. Two entry points share one scanner:
//!
//! - [`parse`] is strict: the whole input must match and errors are typed.
//! - [`whole_hours`] never fails: it reads the longest well-formed prefix
//!   and returns its hour component, or 0 when there is none.
//!
//! Only whole hours count toward scoring. Minutes and seconds are read and
//! dropped, so a 59 minute VOD scores the same as an empty one.

use crate::error::DurationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A duration split into its encoded components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoDuration {
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl VideoDuration {
    /// Whole hours used for scoring.
    pub const fn whole_hours(&self) -> u64 {
        self.hours
    }

    /// Total length in seconds, saturating.
    pub fn total_seconds(&self) -> u64 {
        self.hours
            .saturating_mul(3600)
            .saturating_add(self.minutes.saturating_mul(60))
            .saturating_add(self.seconds)
    }
}

impl fmt::Display for VideoDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hours > 0 {
            write!(f, "{}h", self.hours)?;
        }
        if self.minutes > 0 {
            write!(f, "{}m", self.minutes)?;
        }
        if self.seconds > 0 || (self.hours == 0 && self.minutes == 0) {
            write!(f, "{}s", self.seconds)?;
        }
        Ok(())
    }
}

impl FromStr for VideoDuration {
    type Err = DurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

/// Parse a duration, rejecting anything outside the grammar.
pub fn parse(raw: &str) -> Result<VideoDuration, DurationError> {
    let scan = scan(raw);
    if let Some(err) = scan.error {
        return Err(err);
    }
    if let Some(position) = scan.overflow {
        return Err(DurationError::Overflow { position });
    }
    if scan.components == 0 {
        return Err(DurationError::Empty);
    }
    Ok(scan.duration)
}

/// Whole hours of a duration string. Never fails.
///
/// # Examples
///
/// ```
/// use vodpoints_scoring::whole_hours;
///
/// assert_eq!(whole_hours("5h20m3s"), 5);
/// assert_eq!(whole_hours("59m59s"), 0);
/// assert_eq!(whole_hours("garbage"), 0);
/// ```
pub fn whole_hours(raw: &str) -> u64 {
    scan(raw).duration.hours
}

struct Scan {
    /// Components of the longest well-formed prefix.
    duration: VideoDuration,
    components: usize,
    /// Start of the first saturated component in the prefix.
    overflow: Option<usize>,
    /// Why scanning stopped before the end of input.
    error: Option<DurationError>,
}

fn scan(raw: &str) -> Scan {
    let bytes = raw.as_bytes();
    let mut out = Scan {
        duration: VideoDuration::default(),
        components: 0,
        overflow: None,
        error: None,
    };
    let mut last_rank: Option<u8> = None;
    let mut pos = 0;

    while pos < bytes.len() {
        let start = pos;
        let mut value: u64 = 0;
        let mut overflowed = false;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            let digit = u64::from(bytes[pos] - b'0');
            match value.checked_mul(10).and_then(|v| v.checked_add(digit)) {
                Some(v) => value = v,
                None => {
                    value = u64::MAX;
                    overflowed = true;
                }
            }
            pos += 1;
        }

        if pos == start {
            out.error = Some(DurationError::UnexpectedChar {
                position: start,
                found: char_at(raw, start),
            });
            break;
        }

        let Some(&unit) = bytes.get(pos) else {
            out.error = Some(DurationError::MissingUnit { position: start });
            break;
        };

        let rank = match unit {
            b'h' => 0,
            b'm' => 1,
            b's' => 2,
            _ => {
                out.error = Some(DurationError::UnexpectedChar {
                    position: pos,
                    found: char_at(raw, pos),
                });
                break;
            }
        };

        if last_rank.is_some_and(|last| rank <= last) {
            out.error = Some(DurationError::OutOfOrder {
                position: pos,
                unit: unit as char,
            });
            break;
        }

        match rank {
            0 => out.duration.hours = value,
            1 => out.duration.minutes = value,
            _ => out.duration.seconds = value,
        }
        if overflowed && out.overflow.is_none() {
            out.overflow = Some(start);
        }
        out.components += 1;
        last_rank = Some(rank);
        pos += 1;
    }

    out
}

fn char_at(raw: &str, position: usize) -> char {
    raw.get(position..)
        .and_then(|rest| rest.chars().next())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn full_duration() {
        let d = parse("5h20m3s").unwrap();
        assert_eq!(d, VideoDuration { hours: 5, minutes: 20, seconds: 3 });
        assert_eq!(d.whole_hours(), 5);
        assert_eq!(d.total_seconds(), 5 * 3600 + 20 * 60 + 3);
    }

    #[test]
    fn partial_components() {
        assert_eq!(parse("25h").unwrap().hours, 25);
        assert_eq!(parse("59m").unwrap(), VideoDuration { hours: 0, minutes: 59, seconds: 0 });
        assert_eq!(parse("1h30s").unwrap(), VideoDuration { hours: 1, minutes: 0, seconds: 30 });
    }

    #[test]
    fn under_an_hour_scores_zero_hours() {
        assert_eq!(whole_hours("59m59s"), 0);
        assert_eq!(whole_hours("0s"), 0);
        assert_eq!(whole_hours(""), 0);
    }

    #[test]
    fn lenient_reads_longest_valid_prefix() {
        assert_eq!(whole_hours("5h20mXYZ"), 5);
        assert_eq!(whole_hours("5h5h"), 5);
        assert_eq!(whole_hours("20m5h"), 0);
        assert_eq!(whole_hours("12"), 0);
        assert_eq!(whole_hours(" 5h"), 0);
    }

    #[test]
    fn strict_errors() {
        assert_eq!(parse(""), Err(DurationError::Empty));
        assert_eq!(
            parse("5x"),
            Err(DurationError::UnexpectedChar { position: 1, found: 'x' })
        );
        assert_eq!(
            parse("h"),
            Err(DurationError::UnexpectedChar { position: 0, found: 'h' })
        );
        assert_eq!(
            parse("20m5h"),
            Err(DurationError::OutOfOrder { position: 4, unit: 'h' })
        );
        assert_eq!(
            parse("5h5h"),
            Err(DurationError::OutOfOrder { position: 3, unit: 'h' })
        );
        assert_eq!(parse("3h12"), Err(DurationError::MissingUnit { position: 2 }));
        assert_eq!(
            parse("5h20m\u{e9}"),
            Err(DurationError::UnexpectedChar { position: 5, found: '\u{e9}' })
        );
    }

    #[test]
    fn overflow_saturates_leniently() {
        let raw = "99999999999999999999999h";
        assert_eq!(parse(raw), Err(DurationError::Overflow { position: 0 }));
        assert_eq!(whole_hours(raw), u64::MAX);
    }

    #[test]
    fn from_str_and_display() {
        let d: VideoDuration = "2h0m7s".parse().unwrap();
        assert_eq!(d.to_string(), "2h7s");
        assert_eq!(VideoDuration::default().to_string(), "0s");
    }

    proptest! {
        #[test]
        fn whole_hours_never_panics(raw in ".*") {
            let _ = whole_hours(&raw);
        }

        #[test]
        fn hour_component_is_extracted(h in 0u64..1000, m in 0u64..60, s in 0u64..60) {
            prop_assert_eq!(whole_hours(&format!("{}h{}m{}s", h, m, s)), h);
            prop_assert_eq!(whole_hours(&format!("{}m{}s", m, s)), 0);
        }

        #[test]
        fn strict_agrees_with_lenient_on_success(raw in "[0-9hms]{0,12}") {
            if let Ok(d) = parse(&raw) {
                prop_assert_eq!(d.whole_hours(), whole_hours(&raw));
            }
        }
    }
}
