//! Video reference parsing.
//!
//! A reference is anything containing a `videos/<digits>` path segment,
//! usually a full link such as `https://www.twitch.tv/videos/2245879631`.
//! The first `videos/` followed by at least one digit wins; the id is the
//! whole digit run after it.

use crate::error::ReferenceError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const VIDEO_SEGMENT: &str = "videos/";

/// Numeric identifier of a VOD on the hosting platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for VideoId {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

/// Extract the video id from a reference.
///
/// # Examples
///
/// ```
/// use vodpoints_scoring::parse_reference;
///
/// let id = parse_reference("https://www.twitch.tv/videos/2245879631?t=1h2m").unwrap();
/// assert_eq!(id.as_str(), "2245879631");
/// assert!(parse_reference("https://www.twitch.tv/somechannel").is_err());
/// ```
pub fn parse(raw: &str) -> Result<VideoId, ReferenceError> {
    if raw.trim().is_empty() {
        return Err(ReferenceError::Empty);
    }

    let mut saw_segment = false;
    for (index, _) in raw.match_indices(VIDEO_SEGMENT) {
        saw_segment = true;
        let rest = &raw[index + VIDEO_SEGMENT.len()..];
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits > 0 {
            return Ok(VideoId(rest[..digits].to_string()));
        }
    }

    if saw_segment {
        Err(ReferenceError::MissingIdentifier)
    } else {
        Err(ReferenceError::MissingVideoSegment)
    }
}
