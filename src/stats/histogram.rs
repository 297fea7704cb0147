//! Equi-height histograms and most-common-value tables
//!
//! Buckets hold (approximately) equal sample counts, which keeps estimation
//! error bounded on skewed data. Partial bucket overlap interpolates by
//! value position: linearly for numeric and timestamp data, and through the
//! PostgreSQL convert-one-string-to-scalar mapping for strings.

use crate::types::{Timestamp, Value, ValueKind};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Bytes of string considered by the string-to-scalar mapping. Longer
/// suffixes cannot move the fraction by more than 256^-12 and would overflow
/// the denominator.
const STRING_SCALAR_BYTES: usize = 12;

/// One histogram bucket. The upper bound is inclusive only in the last
/// bucket of a histogram; repeated boundary values never straddle buckets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistogramBucket {
    pub lower_bound: Value,
    pub upper_bound: Value,
    pub count: u64,
    pub distinct_count: u64,
}

/// Equi-height histogram over the non-null values of one field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Histogram {
    pub buckets: Vec<HistogramBucket>,
    /// Non-null values represented by the buckets.
    pub total_count: u64,
    pub null_count: u64,
    pub distinct_count: u64,
    pub built_at: Timestamp,
}

impl Histogram {
    /// Build from an already sorted, non-null sample set.
    ///
    /// Targets `ceil(n / bucket_count)` values per bucket, then extends each
    /// bucket over trailing duplicates so equal values never straddle a
    /// bucket boundary.
    pub fn from_sorted_samples(samples: &[Value], bucket_count: usize) -> Self {
        let n = samples.len();
        if n == 0 || bucket_count == 0 {
            return Self {
                buckets: Vec::new(),
                total_count: 0,
                null_count: 0,
                distinct_count: 0,
                built_at: Timestamp::now(),
            };
        }

        let values_per_bucket = n.div_ceil(bucket_count);
        let mut buckets = Vec::new();
        let mut start = 0usize;
        let mut total_distinct = 0u64;

        while start < n {
            let mut end = (start + values_per_bucket).min(n);
            // Pull trailing duplicates into this bucket.
            while end < n && samples[end] == samples[end - 1] {
                end += 1;
            }

            let slice = &samples[start..end];
            let mut distinct = 1u64;
            for i in 1..slice.len() {
                if slice[i] != slice[i - 1] {
                    distinct += 1;
                }
            }
            total_distinct += distinct;

            buckets.push(HistogramBucket {
                lower_bound: slice[0].clone(),
                upper_bound: slice[slice.len() - 1].clone(),
                count: slice.len() as u64,
                distinct_count: distinct,
            });
            start = end;
        }

        Self {
            buckets,
            total_count: n as u64,
            null_count: 0,
            distinct_count: total_distinct,
            built_at: Timestamp::now(),
        }
    }

    pub fn with_null_count(mut self, null_count: u64) -> Self {
        self.null_count = null_count;
        self
    }

    pub fn with_distinct_count(mut self, distinct_count: u64) -> Self {
        self.distinct_count = distinct_count;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty() || self.total_count == 0
    }

    /// Fraction of non-null values equal to `value`, in [0, 1].
    pub fn equals_selectivity(&self, value: &Value) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        for bucket in &self.buckets {
            if bucket_contains(bucket, value) {
                let bucket_fraction = bucket.count as f64 / self.total_count as f64;
                return clamp(bucket_fraction / bucket.distinct_count.max(1) as f64);
            }
        }
        0.0
    }

    /// Fraction of non-null values inside the given range, in [0, 1].
    /// Either bound may be absent (half-open query ranges).
    pub fn range_selectivity(
        &self,
        min: Option<&Value>,
        max: Option<&Value>,
        _min_inclusive: bool,
        _max_inclusive: bool,
    ) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let mut matched = 0.0f64;
        for bucket in &self.buckets {
            matched += bucket.count as f64 * self.bucket_overlap(bucket, min, max);
        }
        clamp(matched / self.total_count as f64)
    }

    /// Fraction of values strictly (or weakly) below `value`.
    pub fn less_than_selectivity(&self, value: &Value, inclusive: bool) -> f64 {
        self.range_selectivity(None, Some(value), false, inclusive)
    }

    /// Fraction of values strictly (or weakly) above `value`.
    pub fn greater_than_selectivity(&self, value: &Value, inclusive: bool) -> f64 {
        self.range_selectivity(Some(value), None, inclusive, false)
    }

    /// Fraction of rows that are null (or non-null).
    pub fn null_selectivity(&self, is_null: bool) -> f64 {
        let total = self.total_count + self.null_count;
        if total == 0 {
            return 0.0;
        }
        let null_fraction = self.null_count as f64 / total as f64;
        if is_null {
            clamp(null_fraction)
        } else {
            clamp(1.0 - null_fraction)
        }
    }

    /// Fraction of a bucket's values falling inside [min, max]; 1.0 when the
    /// bucket lies fully inside, 0.0 when fully outside.
    fn bucket_overlap(
        &self,
        bucket: &HistogramBucket,
        min: Option<&Value>,
        max: Option<&Value>,
    ) -> f64 {
        // Fully outside?
        if let Some(min) = min {
            if bucket.upper_bound.compare(min) == Ordering::Less {
                return 0.0;
            }
        }
        if let Some(max) = max {
            if bucket.lower_bound.compare(max) == Ordering::Greater {
                return 0.0;
            }
        }

        let low_pos = match min {
            Some(min) if min.compare(&bucket.lower_bound) == Ordering::Greater => {
                bucket_position(min, &bucket.lower_bound, &bucket.upper_bound)
            }
            _ => 0.0,
        };
        let high_pos = match max {
            Some(max) if max.compare(&bucket.upper_bound) == Ordering::Less => {
                bucket_position(max, &bucket.lower_bound, &bucket.upper_bound)
            }
            _ => 1.0,
        };
        clamp(high_pos - low_pos)
    }
}

/// Whether a bucket's value span contains `value`. Boundary duplicates
/// collapse into the bucket that holds them, so an inclusive upper check is
/// correct for the last bucket and harmless elsewhere (the next bucket
/// starts strictly above).
fn bucket_contains(bucket: &HistogramBucket, value: &Value) -> bool {
    value.compare(&bucket.lower_bound) != Ordering::Less
        && value.compare(&bucket.upper_bound) != Ordering::Greater
}

/// Position of `value` within [lower, upper] as a fraction in [0, 1].
/// Numeric and timestamp values interpolate linearly; strings go through the
/// base-256 scalar mapping; other tags fall back to 0.5.
fn bucket_position(value: &Value, lower: &Value, upper: &Value) -> f64 {
    match (value.kind(), lower.kind(), upper.kind()) {
        (ValueKind::Numeric, ValueKind::Numeric, ValueKind::Numeric) => {
            let (v, lo, hi) = (
                value.as_f64().unwrap_or(0.0),
                lower.as_f64().unwrap_or(0.0),
                upper.as_f64().unwrap_or(0.0),
            );
            linear_position(v, lo, hi)
        }
        (ValueKind::Timestamp, ValueKind::Timestamp, ValueKind::Timestamp) => {
            match (value, lower, upper) {
                (Value::Timestamp(v), Value::Timestamp(lo), Value::Timestamp(hi)) => {
                    linear_position(
                        v.as_micros() as f64,
                        lo.as_micros() as f64,
                        hi.as_micros() as f64,
                    )
                }
                _ => 0.5,
            }
        }
        (ValueKind::Text, ValueKind::Text, ValueKind::Text) => {
            match (value, lower, upper) {
                (Value::Text(v), Value::Text(lo), Value::Text(hi)) => {
                    string_position(v, lo, hi)
                }
                _ => 0.5,
            }
        }
        // Conservative default for booleans, bytes, and mixed-tag buckets.
        _ => 0.5,
    }
}

fn linear_position(value: f64, lower: f64, upper: f64) -> f64 {
    let span = upper - lower;
    if span <= 0.0 || !span.is_finite() {
        return 0.5;
    }
    clamp((value - lower) / span)
}

/// PostgreSQL's convert-one-string-to-scalar: strip the common prefix of the
/// bucket bounds, then map the next bytes of each string into a base-256
/// fraction and interpolate.
fn string_position(value: &str, lower: &str, upper: &str) -> f64 {
    let lo = lower.as_bytes();
    let hi = upper.as_bytes();
    let val = value.as_bytes();

    // Greatest common prefix of the bucket bounds.
    let mut prefix = 0usize;
    while prefix < lo.len() && prefix < hi.len() && lo[prefix] == hi[prefix] {
        prefix += 1;
    }

    let value_scalar = string_fraction(&val[prefix.min(val.len())..]);
    let lower_scalar = string_fraction(&lo[prefix..]);
    let upper_scalar = string_fraction(&hi[prefix..]);

    let denominator = upper_scalar - lower_scalar;
    if denominator <= 0.0 {
        return 0.5;
    }
    clamp((value_scalar - lower_scalar) / denominator)
}

/// Map a byte string into [0, 1] by treating up to the first 12 bytes as
/// base-256 digits of a fraction.
fn string_fraction(bytes: &[u8]) -> f64 {
    let mut fraction = 0.0f64;
    let mut denominator = 256.0f64;
    for &b in bytes.iter().take(STRING_SCALAR_BYTES) {
        fraction += b as f64 / denominator;
        denominator *= 256.0;
    }
    fraction
}

fn clamp(x: f64) -> f64 {
    if x.is_nan() {
        return 0.0;
    }
    x.clamp(0.0, 1.0)
}

/// Most-common-value table: values and their frequencies (fractions of all
/// non-null rows). The companion histogram must be built from samples with
/// these values removed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct McvTable {
    entries: Vec<(Value, f64)>,
}

impl McvTable {
    pub fn new(entries: Vec<(Value, f64)>) -> Self {
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[(Value, f64)] {
        &self.entries
    }

    /// Sum of all MCV frequencies.
    pub fn total_frequency(&self) -> f64 {
        self.entries.iter().map(|(_, f)| f).sum()
    }

    pub fn frequency_of(&self, value: &Value) -> Option<f64> {
        self.entries
            .iter()
            .find(|(v, _)| v.compare(value) == Ordering::Equal)
            .map(|(_, f)| *f)
    }

    /// Combined equality selectivity: the MCV frequency when the value is a
    /// known common value, otherwise the histogram estimate scaled by the
    /// non-MCV mass.
    pub fn equals_selectivity(&self, histogram: &Histogram, value: &Value) -> f64 {
        if let Some(frequency) = self.frequency_of(value) {
            return clamp(frequency);
        }
        clamp(histogram.equals_selectivity(value) * (1.0 - self.total_frequency()))
    }

    /// Combined range selectivity: MCV entries inside the range contribute
    /// their exact frequencies; the histogram covers the rest.
    pub fn range_selectivity(
        &self,
        histogram: &Histogram,
        min: Option<&Value>,
        max: Option<&Value>,
        min_inclusive: bool,
        max_inclusive: bool,
    ) -> f64 {
        let mut mcv_part = 0.0;
        for (value, frequency) in &self.entries {
            if value_in_range(value, min, max, min_inclusive, max_inclusive) {
                mcv_part += frequency;
            }
        }
        let histogram_part =
            histogram.range_selectivity(min, max, min_inclusive, max_inclusive)
                * (1.0 - self.total_frequency());
        clamp(mcv_part + histogram_part)
    }
}

fn value_in_range(
    value: &Value,
    min: Option<&Value>,
    max: Option<&Value>,
    min_inclusive: bool,
    max_inclusive: bool,
) -> bool {
    if let Some(min) = min {
        match value.compare(min) {
            Ordering::Less => return false,
            Ordering::Equal if !min_inclusive => return false,
            _ => {}
        }
    }
    if let Some(max) = max {
        match value.compare(max) {
            Ordering::Greater => return false,
            Ordering::Equal if !max_inclusive => return false,
            _ => {}
        }
    }
    true
}

/// Streaming histogram construction: feed values, then build an equi-height
/// histogram plus MCV table from the collected reservoir sample.
pub struct HistogramBuilder {
    sampler: super::ReservoirSampler<Value>,
    distinct: super::HyperLogLog,
    null_count: u64,
    bucket_count: usize,
    mcv_limit: usize,
}

impl HistogramBuilder {
    pub fn new(reservoir_size: usize, bucket_count: usize) -> Self {
        Self {
            sampler: super::ReservoirSampler::new(reservoir_size),
            distinct: super::HyperLogLog::default(),
            null_count: 0,
            bucket_count,
            mcv_limit: 10,
        }
    }

    pub fn with_mcv_limit(mut self, mcv_limit: usize) -> Self {
        self.mcv_limit = mcv_limit;
        self
    }

    pub fn add(&mut self, value: Value) {
        if value.is_null() {
            self.null_count += 1;
            return;
        }
        self.distinct.add(&value);
        self.sampler.add(value);
    }

    /// Build the histogram and MCV table. The histogram is constructed from
    /// the sample with MCV entries excluded, so combined estimation does not
    /// double-count common values.
    pub fn build(&self) -> (Histogram, McvTable) {
        let mut samples: Vec<Value> = self.sampler.samples().to_vec();
        samples.sort();

        let mcv = self.extract_mcv(&samples);
        let filtered: Vec<Value> = if mcv.is_empty() {
            samples
        } else {
            samples
                .into_iter()
                .filter(|v| mcv.frequency_of(v).is_none())
                .collect()
        };

        let histogram = Histogram::from_sorted_samples(&filtered, self.bucket_count)
            .with_null_count(self.null_count)
            .with_distinct_count(self.distinct.estimate().round() as u64);
        (histogram, mcv)
    }

    /// Values appearing at least twice in the sorted sample, most frequent
    /// first, capped at the configured limit.
    fn extract_mcv(&self, sorted: &[Value]) -> McvTable {
        if sorted.is_empty() || self.mcv_limit == 0 {
            return McvTable::default();
        }
        let n = sorted.len() as f64;
        let mut runs: Vec<(Value, u64)> = Vec::new();
        let mut i = 0;
        while i < sorted.len() {
            let mut j = i + 1;
            while j < sorted.len() && sorted[j] == sorted[i] {
                j += 1;
            }
            let run = (j - i) as u64;
            if run >= 2 {
                runs.push((sorted[i].clone(), run));
            }
            i = j;
        }
        runs.sort_by(|a, b| b.1.cmp(&a.1));
        runs.truncate(self.mcv_limit);
        McvTable::new(
            runs.into_iter()
                .map(|(v, c)| (v, c as f64 / n))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i64]) -> Vec<Value> {
        values.iter().map(|v| Value::Integer(*v)).collect()
    }

    fn scenario_histogram() -> Histogram {
        // Buckets [(0,100,count=100), (100,200,count=50)]
        Histogram {
            buckets: vec![
                HistogramBucket {
                    lower_bound: Value::Integer(0),
                    upper_bound: Value::Integer(100),
                    count: 100,
                    distinct_count: 50,
                },
                HistogramBucket {
                    lower_bound: Value::Integer(100),
                    upper_bound: Value::Integer(200),
                    count: 50,
                    distinct_count: 25,
                },
            ],
            total_count: 150,
            null_count: 0,
            distinct_count: 75,
            built_at: Timestamp::from_micros(0),
        }
    }

    #[test]
    fn test_range_selectivity_scenario() {
        // field < 150 => (100 + 0.5 * 50) / 150
        let h = scenario_histogram();
        let sel = h.less_than_selectivity(&Value::Integer(150), false);
        assert!((sel - 0.8333).abs() < 0.01, "selectivity {sel}");
    }

    #[test]
    fn test_range_selectivity_bounds() {
        let h = scenario_histogram();
        assert_eq!(h.range_selectivity(None, None, false, false), 1.0);
        let below = h.less_than_selectivity(&Value::Integer(-10), false);
        assert_eq!(below, 0.0);
        let above = h.greater_than_selectivity(&Value::Integer(500), false);
        assert_eq!(above, 0.0);
    }

    #[test]
    fn test_equals_selectivity() {
        let h = scenario_histogram();
        // Bucket fraction 100/150 over 50 distinct values.
        let sel = h.equals_selectivity(&Value::Integer(50));
        assert!((sel - (100.0 / 150.0) / 50.0).abs() < 1e-9);
        assert_eq!(h.equals_selectivity(&Value::Integer(1000)), 0.0);
    }

    #[test]
    fn test_selectivities_in_unit_interval() {
        let h = scenario_histogram();
        for v in [-100i64, 0, 50, 100, 150, 200, 300] {
            let value = Value::Integer(v);
            let eq = h.equals_selectivity(&value);
            assert!((0.0..=1.0).contains(&eq), "eq {eq} for {v}");
            let lt = h.less_than_selectivity(&value, false);
            assert!((0.0..=1.0).contains(&lt), "lt {lt} for {v}");
            let gt = h.greater_than_selectivity(&value, true);
            assert!((0.0..=1.0).contains(&gt), "gt {gt} for {v}");
        }
    }

    #[test]
    fn test_equi_height_construction() {
        let samples = ints(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
        let h = Histogram::from_sorted_samples(&samples, 4);
        assert_eq!(h.buckets.len(), 4);
        assert_eq!(h.total_count, 12);
        for bucket in &h.buckets {
            assert_eq!(bucket.count, 3);
        }
    }

    #[test]
    fn test_duplicates_do_not_straddle_buckets() {
        // Six copies of 5 would straddle a 3-value bucket boundary.
        let samples = ints(&[1, 2, 5, 5, 5, 5, 5, 5, 9, 10]);
        let h = Histogram::from_sorted_samples(&samples, 3);
        for window in h.buckets.windows(2) {
            assert!(
                window[1].lower_bound.compare(&window[0].upper_bound)
                    == Ordering::Greater,
                "buckets overlap: {window:?}"
            );
        }
    }

    #[test]
    fn test_string_interpolation() {
        let samples: Vec<Value> = ["apple", "banana", "cherry", "grape", "mango", "peach"]
            .iter()
            .map(|s| Value::Text(s.to_string()))
            .collect();
        let h = Histogram::from_sorted_samples(&samples, 2);
        let sel = h.less_than_selectivity(&Value::Text("dog".into()), false);
        assert!((0.0..=1.0).contains(&sel));
        // "dog" sorts after half the values; expect a mid-range estimate.
        assert!(sel > 0.2 && sel < 0.9, "selectivity {sel}");
    }

    #[test]
    fn test_string_position_common_prefix() {
        // Shared prefix "ab" must be stripped before interpolating.
        let pos = string_position("abm", "aba", "abz");
        assert!(pos > 0.4 && pos < 0.6, "position {pos}");
    }

    #[test]
    fn test_null_selectivity() {
        let h = scenario_histogram().with_null_count(50);
        assert!((h.null_selectivity(true) - 0.25).abs() < 1e-9);
        assert!((h.null_selectivity(false) - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_empty_histogram() {
        let h = Histogram::from_sorted_samples(&[], 8);
        assert!(h.is_empty());
        assert_eq!(h.equals_selectivity(&Value::Integer(1)), 0.0);
        assert_eq!(h.range_selectivity(None, None, false, false), 0.0);
    }

    #[test]
    fn test_mcv_composition() {
        // 40% of rows are value 7; histogram covers the rest.
        let rest = ints(&[1, 2, 3, 4, 5, 6]);
        let h = Histogram::from_sorted_samples(&rest, 2);
        let mcv = McvTable::new(vec![(Value::Integer(7), 0.4)]);

        let sel = mcv.equals_selectivity(&h, &Value::Integer(7));
        assert!((sel - 0.4).abs() < 1e-9);

        // A non-MCV value scales the histogram estimate by the non-MCV mass.
        let hist_sel = h.equals_selectivity(&Value::Integer(3));
        let combined = mcv.equals_selectivity(&h, &Value::Integer(3));
        assert!((combined - hist_sel * 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_mcv_range_composition() {
        let rest = ints(&[1, 2, 3, 4, 5, 6]);
        let h = Histogram::from_sorted_samples(&rest, 2);
        let mcv = McvTable::new(vec![(Value::Integer(7), 0.4)]);

        // Range covering everything including the MCV value.
        let sel = mcv.range_selectivity(&h, None, Some(&Value::Integer(100)), false, true);
        assert!((sel - 1.0).abs() < 0.01, "selectivity {sel}");

        // Range excluding the MCV value.
        let sel = mcv.range_selectivity(&h, None, Some(&Value::Integer(6)), false, true);
        assert!(sel <= 0.65, "selectivity {sel}");
    }

    #[test]
    fn test_builder_excludes_mcv_from_histogram() {
        let mut builder = HistogramBuilder::new(1024, 8);
        for _ in 0..500 {
            builder.add(Value::Integer(42));
        }
        for i in 0..500 {
            builder.add(Value::Integer(i));
        }
        let (histogram, mcv) = builder.build();
        assert!(mcv.frequency_of(&Value::Integer(42)).is_some());
        // The dominant value must not inflate any histogram bucket.
        for bucket in &histogram.buckets {
            assert!(bucket.count < 450, "bucket absorbed the MCV: {bucket:?}");
        }
    }

    #[test]
    fn test_builder_counts_nulls() {
        let mut builder = HistogramBuilder::new(64, 4);
        for i in 0..30 {
            builder.add(Value::Integer(i));
        }
        for _ in 0..10 {
            builder.add(Value::Null);
        }
        let (histogram, _) = builder.build();
        assert_eq!(histogram.null_count, 10);
        assert!((histogram.null_selectivity(true) - 0.25).abs() < 1e-9);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_selectivities_in_unit_interval(
            mut samples in prop::collection::vec(-1000i64..1000, 1..300),
            probe in -1500i64..1500,
            buckets in 1usize..16,
        ) {
            samples.sort_unstable();
            let values: Vec<Value> = samples.into_iter().map(Value::Integer).collect();
            let histogram = Histogram::from_sorted_samples(&values, buckets);
            let probe = Value::Integer(probe);

            let eq = histogram.equals_selectivity(&probe);
            prop_assert!((0.0..=1.0).contains(&eq));

            let lt = histogram.less_than_selectivity(&probe, false);
            prop_assert!((0.0..=1.0).contains(&lt));

            let gt = histogram.greater_than_selectivity(&probe, true);
            prop_assert!((0.0..=1.0).contains(&gt));
        }

        #[test]
        fn prop_range_selectivity_monotone(
            mut samples in prop::collection::vec(-500i64..500, 10..200),
            low in -600i64..600,
            width in 0i64..400,
        ) {
            samples.sort_unstable();
            let values: Vec<Value> = samples.into_iter().map(Value::Integer).collect();
            let histogram = Histogram::from_sorted_samples(&values, 8);

            let narrow = histogram.range_selectivity(
                Some(&Value::Integer(low)),
                Some(&Value::Integer(low + width)),
                true,
                true,
            );
            let wide = histogram.range_selectivity(
                Some(&Value::Integer(low)),
                Some(&Value::Integer(low + width * 2)),
                true,
                true,
            );
            prop_assert!(wide >= narrow - 1e-9);
        }

        #[test]
        fn prop_total_range_covers_everything(
            mut samples in prop::collection::vec(-100i64..100, 1..100),
        ) {
            samples.sort_unstable();
            let values: Vec<Value> = samples.into_iter().map(Value::Integer).collect();
            let histogram = Histogram::from_sorted_samples(&values, 4);
            let sel = histogram.range_selectivity(None, None, false, false);
            prop_assert!((sel - 1.0).abs() < 1e-9);
        }
    }
}
