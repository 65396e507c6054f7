//! Health scoring.
//!
//! A logger accumulates signed deltas into a raw score. The normalized score is
//! a percentage of the declared total, clamped to [`MIN_HEALTH`]..=[`MAX_HEALTH`].
//! Without a declared total the raw score is read as if it already were a
//! percentage.

use serde::{Deserialize, Serialize};

/// Lowest normalized health.
pub const MIN_HEALTH: i64 = -100;
/// Highest normalized health.
pub const MAX_HEALTH: i64 = 100;

const BAR_WIDTH: i64 = 20;
const BAR_FILLED: char = '█';
const BAR_FILLED_NEGATIVE: char = '▓';
const BAR_EMPTY: char = '░';
const UNKNOWN_INDICATOR: &str = "❓";

/// Clamps a value into the normalized health range.
#[must_use]
pub fn clamp_health(value: i64) -> i64 {
    value.clamp(MIN_HEALTH, MAX_HEALTH)
}

/// Normalizes a raw score against a declared total.
///
/// Integer division truncates toward zero. A total of zero means "not
/// declared" and the raw score is clamped directly.
#[must_use]
pub fn normalize(raw: i64, total: i64) -> i64 {
    if total == 0 {
        return clamp_health(raw);
    }
    let percent = i128::from(raw) * 100 / i128::from(total);
    percent.clamp(i128::from(MIN_HEALTH), i128::from(MAX_HEALTH)) as i64
}

/// Running health of one logger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HealthScore {
    raw: i64,
    total: i64,
    normalized: i64,
}

impl HealthScore {
    /// A fresh score: raw 0, no declared total.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            raw: 0,
            total: 0,
            normalized: 0,
        }
    }

    /// Applies a delta and recomputes the normalized value.
    pub fn update(&mut self, delta: i64) {
        self.raw = self.raw.saturating_add(delta);
        self.recompute();
    }

    /// Sets the denominator used for normalization.
    pub fn declare_total(&mut self, total: i64) {
        self.total = total;
        self.recompute();
    }

    fn recompute(&mut self) {
        self.normalized = normalize(self.raw, self.total);
    }

    /// Cumulative raw score.
    #[must_use]
    pub const fn raw(&self) -> i64 {
        self.raw
    }

    /// Declared total, 0 when undeclared.
    #[must_use]
    pub const fn total(&self) -> i64 {
        self.total
    }

    /// Normalized percentage in `-100..=100`.
    #[must_use]
    pub const fn normalized(&self) -> i64 {
        self.normalized
    }
}

/// One row of the severity table. Every field may be left out of a config
/// row and falls back on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthBand {
    /// Lowest normalized health that falls in this band.
    #[serde(default)]
    pub threshold: i64,
    /// Indicator symbol.
    #[serde(default = "unknown_indicator")]
    pub emoji: String,
    /// Human description.
    #[serde(default)]
    pub description: String,
}

fn unknown_indicator() -> String {
    UNKNOWN_INDICATOR.to_string()
}

impl HealthBand {
    fn new(threshold: i64, emoji: &str, description: &str) -> Self {
        Self {
            threshold,
            emoji: emoji.to_string(),
            description: description.to_string(),
        }
    }
}

/// Ordered severity bands, evaluated first-match from the top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeverityBands {
    bands: Vec<HealthBand>,
}

impl Default for SeverityBands {
    fn default() -> Self {
        Self::new(vec![
            HealthBand::new(90, "💚", "Excellent - all systems healthy"),
            HealthBand::new(80, "💙", "Very Good - minor issues only"),
            HealthBand::new(70, "💛", "Good - some concerns"),
            HealthBand::new(60, "🧡", "Above Average - noticeable issues"),
            HealthBand::new(50, "❤️", "Average - mixed results"),
            HealthBand::new(40, "🤍", "Below Average - attention needed"),
            HealthBand::new(30, "💔", "Fair - significant problems"),
            HealthBand::new(20, "🩹", "Poor - major issues"),
            HealthBand::new(10, "⚠️", "Warning - critical attention needed"),
            HealthBand::new(1, "☠️", "Critical - near failure"),
            HealthBand::new(0, "⚫", "Neutral - balanced state"),
            HealthBand::new(-9, "🔴", "Slight Negative - minor damage"),
            HealthBand::new(-19, "🟠", "Negative - noticeable degradation"),
            HealthBand::new(-29, "🟡", "Declining - system weakening"),
            HealthBand::new(-39, "🟢", "Degraded - significant damage"),
            HealthBand::new(-49, "🔵", "Damaged - major problems"),
            HealthBand::new(-59, "🟣", "Severe - critical damage"),
            HealthBand::new(-69, "🟤", "Critical - near failure"),
            HealthBand::new(-79, "⚫", "Failing - barely functional"),
            HealthBand::new(-89, "⬛", "Near Death - almost gone"),
            HealthBand::new(-100, "💀", "Dead - complete failure"),
        ])
    }
}

impl SeverityBands {
    /// Builds a table from bands in evaluation order.
    #[must_use]
    pub const fn new(bands: Vec<HealthBand>) -> Self {
        Self { bands }
    }

    /// The bands in evaluation order.
    #[must_use]
    pub fn bands(&self) -> &[HealthBand] {
        &self.bands
    }

    /// Consumes the table, returning its bands.
    #[must_use]
    pub fn into_bands(self) -> Vec<HealthBand> {
        self.bands
    }

    /// First band whose threshold `health` reaches.
    #[must_use]
    pub fn band_for(&self, health: i64) -> Option<&HealthBand> {
        self.bands.iter().find(|band| health >= band.threshold)
    }

    /// Indicator symbol for a normalized health value.
    #[must_use]
    pub fn indicator(&self, health: i64) -> &str {
        self.band_for(health)
            .map_or(UNKNOWN_INDICATOR, |band| band.emoji.as_str())
    }

    /// Description for a normalized health value.
    #[must_use]
    pub fn describe(&self, health: i64) -> &str {
        self.band_for(health).map_or("Unknown", |band| band.description.as_str())
    }
}

/// Proportional bar for a normalized health value.
///
/// The filled length is the magnitude; negative health fills with a
/// different glyph.
#[must_use]
pub fn health_bar(health: i64) -> String {
    let clamped = clamp_health(health);
    let filled = (clamped.abs() * BAR_WIDTH / MAX_HEALTH) as usize;
    let empty = BAR_WIDTH as usize - filled;
    let glyph = if clamped < 0 { BAR_FILLED_NEGATIVE } else { BAR_FILLED };

    let mut bar = String::with_capacity((BAR_WIDTH as usize + 2) * 3);
    bar.push('[');
    bar.extend(std::iter::repeat_n(glyph, filled));
    bar.extend(std::iter::repeat_n(BAR_EMPTY, empty));
    bar.push(']');
    bar
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test]
    fn declared_total_scenario() {
        let mut score = HealthScore::new();
        score.declare_total(100);
        score.update(5);
        score.update(20);
        assert_eq!(score.raw(), 25);
        assert_eq!(score.normalized(), 25);
    }

    #[test]
    fn undeclared_total_uses_raw() {
        let mut score = HealthScore::new();
        score.update(42);
        assert_eq!(score.normalized(), 42);
        score.update(100);
        assert_eq!(score.raw(), 142);
        assert_eq!(score.normalized(), 100);
    }

    #[test]
    fn total_declared_mid_sequence() {
        let mut score = HealthScore::new();
        score.update(10);
        assert_eq!(score.normalized(), 10);

        score.declare_total(40);
        assert_eq!(score.normalized(), 25);

        score.update(10);
        assert_eq!(score.normalized(), 50);
    }

    #[test]
    fn normalization_truncates_toward_zero() {
        assert_eq!(normalize(1, 3), 33);
        assert_eq!(normalize(-1, 3), -33);
        assert_eq!(normalize(2, 3), 66);
    }

    #[test]
    fn normalization_never_overflows() {
        assert_eq!(normalize(i64::MAX, 1), 100);
        assert_eq!(normalize(i64::MIN, 1), -100);
        assert_eq!(normalize(i64::MIN, -1), 100);
    }

    #[test]
    fn raw_saturates() {
        let mut score = HealthScore::new();
        score.update(i64::MAX);
        score.update(i64::MAX);
        assert_eq!(score.raw(), i64::MAX);
        assert_eq!(score.normalized(), 100);
    }

    #[test_case(100, "💚" ; "top")]
    #[test_case(90, "💚" ; "excellent threshold")]
    #[test_case(89, "💙" ; "just below excellent")]
    #[test_case(42, "🤍" ; "below average")]
    #[test_case(1, "☠️" ; "lowest positive")]
    #[test_case(0, "⚫" ; "neutral")]
    #[test_case(-1, "🔴" ; "slight negative")]
    #[test_case(-9, "🔴" ; "slight negative threshold")]
    #[test_case(-10, "🟠" ; "negative")]
    #[test_case(-95, "💀" ; "dead")]
    #[test_case(-100, "💀" ; "floor")]
    fn default_indicators(health: i64, expected: &str) {
        assert_eq!(SeverityBands::default().indicator(health), expected);
    }

    #[test]
    fn default_table_has_neutral_band() {
        let bands = SeverityBands::default();
        assert_eq!(bands.bands().len(), 21);
        assert_eq!(bands.describe(0), "Neutral - balanced state");
    }

    #[test]
    fn below_every_threshold_is_unknown() {
        let bands = SeverityBands::new(vec![HealthBand::new(0, "ok", "ok")]);
        assert_eq!(bands.indicator(-5), "❓");
        assert_eq!(bands.describe(-5), "Unknown");
    }

    #[test]
    fn band_row_fields_default_individually() {
        #[derive(Deserialize)]
        struct Table {
            ranges: Vec<HealthBand>,
        }
        let table: Table = toml::from_str(
            "[[ranges]]\nthreshold = 10\nemoji = \"x\"\n[[ranges]]\ndescription = \"floor\"",
        )
        .expect("decode");

        assert_eq!(table.ranges[0], HealthBand::new(10, "x", ""));
        assert_eq!(table.ranges[1], HealthBand::new(0, "❓", "floor"));
    }

    #[test]
    fn bar_shapes() {
        assert_eq!(health_bar(0), format!("[{}]", "░".repeat(20)));
        assert_eq!(health_bar(100), format!("[{}]", "█".repeat(20)));
        assert_eq!(
            health_bar(42),
            format!("[{}{}]", "█".repeat(8), "░".repeat(12))
        );
        assert_eq!(
            health_bar(-50),
            format!("[{}{}]", "▓".repeat(10), "░".repeat(10))
        );
        assert_eq!(health_bar(500), health_bar(100));
    }

    proptest! {
        #[test]
        fn prop_normalized_always_in_range(
            deltas in proptest::collection::vec(any::<i64>(), 0..50),
            total in any::<i64>(),
        ) {
            let mut score = HealthScore::new();
            score.declare_total(total);
            for delta in deltas {
                score.update(delta);
                prop_assert!((MIN_HEALTH..=MAX_HEALTH).contains(&score.normalized()));
            }
        }

        #[test]
        fn prop_zero_total_is_clamped_raw(
            deltas in proptest::collection::vec(-1000i64..1000, 0..50),
        ) {
            let mut score = HealthScore::new();
            for delta in deltas {
                score.update(delta);
                prop_assert_eq!(score.normalized(), clamp_health(score.raw()));
            }
        }

        #[test]
        fn prop_bar_width_constant(health in any::<i64>()) {
            prop_assert_eq!(health_bar(health).chars().count(), 22);
        }
    }
}
