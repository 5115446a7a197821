//! VOD Points scoring
//!
//! Pure functions that turn a submitted VOD into points. No I/O lives here;
//! the ledger and the metadata provider are in `vodpoints-node`.
//!
//! # Modules
//!
//! - [`reference`]: extract the numeric video id from a link
//! - [`duration`]: read whole hours from a compact `1h2m3s` duration
//! - [`threshold`]: hour and view threshold tables, highest rule wins
//!
//! # Example
//!
//! ```
//! use vodpoints_scoring::{parse_reference, total_score, whole_hours};
//!
//! let id = parse_reference("https://www.twitch.tv/videos/2245879631").unwrap();
//! assert_eq!(id.as_str(), "2245879631");
//!
//! let score = total_score(whole_hours("5h20m11s"), 1200);
//! assert_eq!(score.total(), 17);
//! ```

pub mod duration;
pub mod error;
pub mod reference;
pub mod threshold;

pub use duration::{whole_hours, VideoDuration};
pub use error::{DurationError, ReferenceError};
pub use reference::{parse as parse_reference, VideoId};
pub use threshold::{
    points_by_hours, points_by_views, total_score, Score, ThresholdRule, HOURS_TABLE, VIEWS_TABLE,
};
