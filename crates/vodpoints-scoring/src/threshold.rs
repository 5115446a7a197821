//! Threshold tables mapping VOD duration and view count to points.
//!
//! Each table is an ascending list of `(minimum, points)` rules and the
//! highest satisfied rule wins:
//! - hours: 1..=20, one point per whole hour, saturating at 20
//! - views: 0, 100, 350, 500, 800, 1000, 2000, 3000 → 2, 4, 6, 8, 10, 12, 24, 36
//!
//! Both sub-scores are computed independently and summed with no cap.

use serde::{Deserialize, Serialize};

/// A single `(minimum, points)` rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdRule {
    pub minimum: u64,
    pub points: u64,
}

impl ThresholdRule {
    pub const fn new(minimum: u64, points: u64) -> Self {
        Self { minimum, points }
    }
}

/// Points awarded per whole hour of VOD.
pub const HOURS_TABLE: [ThresholdRule; 20] = [
    ThresholdRule::new(1, 1),
    ThresholdRule::new(2, 2),
    ThresholdRule::new(3, 3),
    ThresholdRule::new(4, 4),
    ThresholdRule::new(5, 5),
    ThresholdRule::new(6, 6),
    ThresholdRule::new(7, 7),
    ThresholdRule::new(8, 8),
    ThresholdRule::new(9, 9),
    ThresholdRule::new(10, 10),
    ThresholdRule::new(11, 11),
    ThresholdRule::new(12, 12),
    ThresholdRule::new(13, 13),
    ThresholdRule::new(14, 14),
    ThresholdRule::new(15, 15),
    ThresholdRule::new(16, 16),
    ThresholdRule::new(17, 17),
    ThresholdRule::new(18, 18),
    ThresholdRule::new(19, 19),
    ThresholdRule::new(20, 20),
];

/// Points awarded by view count. The `0` rule guarantees every count matches.
pub const VIEWS_TABLE: [ThresholdRule; 8] = [
    ThresholdRule::new(0, 2),
    ThresholdRule::new(100, 4),
    ThresholdRule::new(350, 6),
    ThresholdRule::new(500, 8),
    ThresholdRule::new(800, 10),
    ThresholdRule::new(1000, 12),
    ThresholdRule::new(2000, 24),
    ThresholdRule::new(3000, 36),
];

/// Check that `minimum` strictly increases across the table.
pub const fn is_strictly_increasing(rules: &[ThresholdRule]) -> bool {
    let mut i = 1;
    while i < rules.len() {
        if rules[i].minimum <= rules[i - 1].minimum {
            return false;
        }
        i += 1;
    }
    true
}

const _: () = assert!(is_strictly_increasing(&HOURS_TABLE));
const _: () = assert!(is_strictly_increasing(&VIEWS_TABLE));
const _: () = assert!(VIEWS_TABLE[0].minimum == 0);

/// Points of the rule with the largest `minimum` not exceeding `value`.
///
/// Returns 0 when `value` is below every rule. Assumes `rules` is sorted
/// by ascending `minimum`.
pub const fn lookup(rules: &[ThresholdRule], value: u64) -> u64 {
    let mut points = 0;
    let mut i = 0;
    while i < rules.len() {
        if value < rules[i].minimum {
            break;
        }
        points = rules[i].points;
        i += 1;
    }
    points
}

/// Points for a VOD lasting `hours` whole hours.
///
/// # Examples
///
/// ```
/// use vodpoints_scoring::points_by_hours;
///
/// assert_eq!(points_by_hours(0), 0);
/// assert_eq!(points_by_hours(5), 5);
/// assert_eq!(points_by_hours(25), 20); // saturates
/// ```
pub const fn points_by_hours(hours: u64) -> u64 {
    lookup(&HOURS_TABLE, hours)
}

/// Points for a VOD with `views` views.
///
/// # Examples
///
/// ```
/// use vodpoints_scoring::points_by_views;
///
/// assert_eq!(points_by_views(0), 2);
/// assert_eq!(points_by_views(1200), 12);
/// assert_eq!(points_by_views(5000), 36); // saturates
/// ```
pub const fn points_by_views(views: u64) -> u64 {
    lookup(&VIEWS_TABLE, views)
}

/// Breakdown of a VOD's score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    pub hours_points: u64,
    pub views_points: u64,
}

impl Score {
    /// Sum of both sub-scores.
    pub const fn total(&self) -> u64 {
        self.hours_points + self.views_points
    }
}

/// Score a VOD from its whole hours and view count.
pub const fn total_score(hours: u64, views: u64) -> Score {
    Score {
        hours_points: points_by_hours(hours),
        views_points: points_by_views(views),
    }
}
