//! Log-scale positioning for the per-node latency histogram.
//!
//! Every horizontal position is a percentage of the plot width in `[0, 100]`
//! and every bar height a fraction of the plot height in `[0, 1]`.

use crate::topology::{LatencyBucket, LatencyHistogram};
use crate::util::format_latency;

/// 1-2-5 progression used for axis ticks and range snapping, in ms.
pub const TICK_SERIES: [f64; 13] = [
    1.0, 2.0, 5.0, 10.0, 20.0, 50.0, 100.0, 200.0, 500.0, 1000.0, 2000.0, 5000.0, 10000.0,
];

/// Values at or below zero are floored to this before taking a logarithm.
pub const LOG_FLOOR: f64 = 0.1;

const LOWER_SNAP: f64 = 0.6;
const UPPER_SNAP: f64 = 1.4;
const EMPTY_AXIS: LogAxis = LogAxis {
    lo: 1.0,
    hi: 1000.0,
};

fn floored(value: f64) -> f64 {
    if value.is_nan() || value <= 0.0 {
        LOG_FLOOR
    } else {
        value
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LogAxis {
    pub lo: f64,
    pub hi: f64,
}

impl LogAxis {
    /// Snaps the data range outwards onto the tick series, falling back to
    /// `min * 0.5` / `max * 1.5` when the series has no suitable entry.
    pub fn from_range(min: f64, max: f64) -> Self {
        let (min, max) = (floored(min), floored(max));

        let lo = TICK_SERIES
            .iter()
            .rev()
            .copied()
            .find(|tick| *tick <= LOWER_SNAP * min)
            .unwrap_or(min * 0.5);
        let hi = TICK_SERIES
            .iter()
            .copied()
            .find(|tick| *tick >= UPPER_SNAP * max)
            .unwrap_or(max * 1.5);

        Self { lo, hi }
    }

    /// Horizontal percentage of `value`, clamped to `[0, 100]`.
    pub fn position(&self, value: f64) -> f64 {
        let lo = floored(self.lo).log10();
        let hi = floored(self.hi).log10();
        let span = hi - lo;
        if !span.is_finite() || span <= 0.0 {
            return 0.0;
        }

        let position = (floored(value).log10() - lo) / span * 100.0;
        position.clamp(0.0, 100.0)
    }

    pub fn ticks(&self) -> Vec<Tick> {
        TICK_SERIES
            .iter()
            .copied()
            .filter(|tick| *tick >= self.lo && *tick <= self.hi)
            .map(|value| Tick {
                value,
                position: self.position(value),
                label: format_latency(value),
            })
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Tick {
    pub value: f64,
    pub position: f64,
    pub label: String,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BarSpan {
    pub upper_bound_ms: f64,
    pub count: u64,
    pub start: f64,
    pub end: f64,
    pub height: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Percentile {
    P50,
    P95,
    P99,
}

impl Percentile {
    pub const ALL: [Percentile; 3] = [Self::P50, Self::P95, Self::P99];

    pub fn quantile(self) -> f64 {
        match self {
            Self::P50 => 0.50,
            Self::P95 => 0.95,
            Self::P99 => 0.99,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::P50 => "p50",
            Self::P95 => "p95",
            Self::P99 => "p99",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PercentileMarker {
    pub percentile: Percentile,
    pub value_ms: f64,
    /// True when the value was interpolated from buckets rather than given.
    pub estimated: bool,
    pub position: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HistogramLayout {
    pub axis: LogAxis,
    pub bars: Vec<BarSpan>,
    pub ticks: Vec<Tick>,
    pub markers: Vec<PercentileMarker>,
    pub total_count: u64,
    /// Requests above the last finite bucket bound.
    pub overflow_count: u64,
}

impl HistogramLayout {
    /// The bar whose horizontal span contains `position`.
    pub fn bucket_at(&self, position: f64) -> Option<&BarSpan> {
        self.bars
            .iter()
            .find(|bar| position >= bar.start && position <= bar.end && bar.end > bar.start)
    }
}

/// Classic bucket interpolation: find the bucket crossing `q * total` and
/// interpolate linearly inside it, the first bucket starting at 0. Ranks that
/// fall among the `overflow` requests resolve to the last finite bound.
pub fn estimate_quantile(buckets: &[LatencyBucket], overflow: u64, q: f64) -> Option<f64> {
    let total = buckets.iter().map(|bucket| bucket.count).sum::<u64>() + overflow;
    if total == 0 || !(0.0..=1.0).contains(&q) {
        return None;
    }

    let rank = q * total as f64;
    let mut cumulative = 0u64;
    let mut lower = 0.0_f64;

    for bucket in buckets {
        let next = cumulative + bucket.count;
        if bucket.count > 0 && next as f64 >= rank {
            let within = (rank - cumulative as f64) / bucket.count as f64;
            return Some(lower + (bucket.upper_bound_ms - lower) * within.clamp(0.0, 1.0));
        }
        cumulative = next;
        lower = bucket.upper_bound_ms;
    }

    buckets.last().map(|bucket| bucket.upper_bound_ms)
}

pub fn layout_histogram(histogram: &LatencyHistogram, min_bar_fraction: f64) -> HistogramLayout {
    let buckets = &histogram.buckets;
    let total_count = histogram.total_count();

    let axis = if buckets.is_empty() {
        EMPTY_AXIS
    } else {
        let (min, max) = buckets.iter().fold((f64::MAX, f64::MIN), |(min, max), bucket| {
            let bound = floored(bucket.upper_bound_ms);
            (min.min(bound), max.max(bound))
        });
        LogAxis::from_range(min, max)
    };

    let max_count = buckets.iter().map(|bucket| bucket.count).max().unwrap_or(0);
    let floor = min_bar_fraction.clamp(0.0, 1.0);

    let mut previous = axis.lo;
    let bars = buckets
        .iter()
        .map(|bucket| {
            let start = axis.position(previous);
            let end = axis.position(bucket.upper_bound_ms);
            previous = bucket.upper_bound_ms;

            let height = if bucket.count == 0 || max_count == 0 {
                0.0
            } else {
                (bucket.count as f64 / max_count as f64).max(floor)
            };

            BarSpan {
                upper_bound_ms: bucket.upper_bound_ms,
                count: bucket.count,
                start,
                end,
                height,
            }
        })
        .collect();

    let given = [histogram.p50, histogram.p95, histogram.p99];
    let markers = Percentile::ALL
        .into_iter()
        .zip(given)
        .filter_map(|(percentile, value)| {
            let (value_ms, estimated) = match value {
                Some(value) => (value, false),
                None => (
                    estimate_quantile(buckets, histogram.overflow_count, percentile.quantile())?,
                    true,
                ),
            };
            Some(PercentileMarker {
                percentile,
                value_ms,
                estimated,
                position: axis.position(value_ms),
            })
        })
        .collect();

    HistogramLayout {
        axis,
        bars,
        ticks: axis.ticks(),
        markers,
        total_count,
        overflow_count: histogram.overflow_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket(upper_bound_ms: f64, count: u64) -> LatencyBucket {
        LatencyBucket {
            upper_bound_ms,
            count,
        }
    }

    fn histogram(buckets: Vec<LatencyBucket>) -> LatencyHistogram {
        LatencyHistogram {
            buckets,
            ..Default::default()
        }
    }

    #[test]
    fn axis_snaps_to_tick_series() {
        let axis = LogAxis::from_range(5.0, 250.0);
        assert_eq!(axis, LogAxis { lo: 2.0, hi: 500.0 });
    }

    #[test]
    fn axis_falls_back_outside_tick_series() {
        let axis = LogAxis::from_range(0.5, 9000.0);
        assert_eq!(axis, LogAxis { lo: 0.25, hi: 13500.0 });
    }

    #[test]
    fn positions_are_strictly_monotonic_and_bounded() {
        let axis = LogAxis::from_range(1.0, 5000.0);
        let bounds = [1.0, 2.5, 10.0, 75.0, 400.0, 5000.0];
        let positions = bounds.map(|bound| axis.position(bound));

        for pair in positions.windows(2) {
            assert!(pair[0] < pair[1], "{positions:?}");
        }
        for position in positions {
            assert!((0.0..=100.0).contains(&position));
        }
    }

    #[test]
    fn out_of_range_and_non_positive_values_are_clamped() {
        let axis = LogAxis { lo: 1.0, hi: 100.0 };
        assert_eq!(axis.position(0.0), 0.0);
        assert_eq!(axis.position(-5.0), 0.0);
        assert_eq!(axis.position(f64::NAN), 0.0);
        assert_eq!(axis.position(1e9), 100.0);
        assert!((axis.position(10.0) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn degenerate_axis_maps_to_zero() {
        let axis = LogAxis { lo: 5.0, hi: 5.0 };
        assert_eq!(axis.position(5.0), 0.0);
    }

    #[test]
    fn bars_span_previous_to_current_bound() {
        let layout = layout_histogram(
            &histogram(vec![bucket(5.0, 4), bucket(25.0, 8), bucket(100.0, 0)]),
            0.02,
        );

        assert_eq!(layout.axis, LogAxis { lo: 2.0, hi: 200.0 });
        assert_eq!(layout.bars[0].start, 0.0);
        assert_eq!(layout.bars[0].end, layout.bars[1].start);
        assert_eq!(layout.bars[1].end, layout.bars[2].start);
        assert!(layout.bars[2].end < 100.0);

        assert_eq!(layout.bars[0].height, 0.5);
        assert_eq!(layout.bars[1].height, 1.0);
        assert_eq!(layout.bars[2].height, 0.0);
        assert_eq!(layout.total_count, 12);
    }

    #[test]
    fn small_counts_get_a_visible_floor() {
        let layout = layout_histogram(&histogram(vec![bucket(10.0, 1), bucket(20.0, 1000)]), 0.05);
        assert_eq!(layout.bars[0].height, 0.05);
    }

    #[test]
    fn all_zero_counts_have_no_height() {
        let layout = layout_histogram(&histogram(vec![bucket(10.0, 0), bucket(20.0, 0)]), 0.05);
        assert!(layout.bars.iter().all(|bar| bar.height == 0.0));
        assert!(layout.markers.is_empty());
    }

    #[test]
    fn empty_histogram_uses_default_axis() {
        let layout = layout_histogram(&LatencyHistogram::default(), 0.02);
        assert!(layout.bars.is_empty());
        assert_eq!(layout.axis, EMPTY_AXIS);
        assert_eq!(layout.ticks.first().map(|tick| tick.value), Some(1.0));
        assert_eq!(layout.ticks.last().map(|tick| tick.value), Some(1000.0));
    }

    #[test]
    fn ticks_stay_inside_axis() {
        let layout = layout_histogram(&histogram(vec![bucket(5.0, 1), bucket(250.0, 1)]), 0.02);
        let values = layout.ticks.iter().map(|tick| tick.value).collect::<Vec<_>>();
        assert_eq!(values, vec![2.0, 5.0, 10.0, 20.0, 50.0, 100.0, 200.0, 500.0]);
        assert_eq!(layout.ticks[0].position, 0.0);
        assert_eq!(layout.ticks[7].position, 100.0);
    }

    #[test]
    fn given_markers_are_used_as_is() {
        let mut input = histogram(vec![bucket(10.0, 5), bucket(100.0, 5)]);
        input.p50 = Some(12.0);
        input.p95 = Some(80.0);
        input.p99 = Some(95.0);
        let layout = layout_histogram(&input, 0.02);

        assert_eq!(layout.markers.len(), 3);
        assert!(layout.markers.iter().all(|marker| !marker.estimated));
        assert_eq!(layout.markers[1].value_ms, 80.0);
        assert_eq!(layout.markers[1].position, layout.axis.position(80.0));
    }

    #[test]
    fn missing_markers_are_estimated() {
        let input = histogram(vec![bucket(10.0, 50), bucket(20.0, 50)]);
        let layout = layout_histogram(&input, 0.02);

        let p50 = layout.markers[0];
        assert!(p50.estimated);
        assert!((p50.value_ms - 10.0).abs() < 1e-9);

        let p95 = layout.markers[1];
        assert!((p95.value_ms - 19.0).abs() < 1e-9);
    }

    #[test]
    fn quantile_interpolates_inside_first_bucket_from_zero() {
        let buckets = [bucket(100.0, 10)];
        assert_eq!(estimate_quantile(&buckets, 0, 0.5), Some(50.0));
        assert_eq!(estimate_quantile(&[], 0, 0.5), None);
        assert_eq!(estimate_quantile(&buckets, 0, 1.5), None);
    }

    #[test]
    fn overflow_tail_counts_toward_quantile_rank() {
        let buckets = [bucket(10.0, 50), bucket(100.0, 40)];
        assert_eq!(estimate_quantile(&buckets, 10, 0.99), Some(100.0));
        assert_eq!(estimate_quantile(&buckets, 10, 0.5), Some(10.0));
        assert_eq!(estimate_quantile(&[], 5, 0.5), None);

        let mut input = histogram(buckets.to_vec());
        input.overflow_count = 10;
        let layout = layout_histogram(&input, 0.02);
        assert_eq!(layout.total_count, 100);
        assert_eq!(layout.overflow_count, 10);
        assert_eq!(layout.bars.len(), 2);
        assert_eq!(layout.markers[2].value_ms, 100.0);
    }

    #[test]
    fn bucket_lookup_by_position() {
        let layout = layout_histogram(&histogram(vec![bucket(5.0, 4), bucket(25.0, 8)]), 0.02);
        let middle = (layout.bars[1].start + layout.bars[1].end) * 0.5;

        assert_eq!(layout.bucket_at(middle).map(|bar| bar.upper_bound_ms), Some(25.0));
        assert_eq!(layout.bucket_at(99.9), None);
    }
}
