//! Summary statistics, bucketing, and section titles.

use std::collections::{BTreeMap, HashMap};

use beacon_timeseries::{Sample, SERIES_PREFIX};

use crate::window::Granularity;

/// Most bucket labels a single chart shows.
pub const MAX_BUCKET_LABELS: usize = 20;

/// Statistics over the raw values of one series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesStats {
    /// Number of samples.
    pub count: usize,
    /// Sum of values.
    pub sum: f64,
    /// Arithmetic mean.
    pub average: f64,
    /// Smallest value.
    pub min: f64,
    /// Largest value.
    pub max: f64,
}

impl SeriesStats {
    /// Computes statistics, or `None` for an empty series.
    pub fn from_samples(samples: &[Sample]) -> Option<Self> {
        let first = samples.first()?.value;
        let (sum, min, max) = samples.iter().fold((0.0, first, first), |(sum, min, max), s| {
            (sum + s.value, min.min(s.value), max.max(s.value))
        });
        Some(Self {
            count: samples.len(),
            sum,
            average: sum / samples.len() as f64,
            min,
            max,
        })
    }
}

/// Chart-ready labels and per-bucket sums, index-aligned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BucketedSeries {
    /// Bucket labels, oldest first.
    pub labels: Vec<String>,
    /// Sum of the sample values in each bucket.
    pub values: Vec<f64>,
}

/// Groups samples into buckets of the given width and sums each bucket.
///
/// Buckets that share a label are summed together, so a minute-bucketed
/// window spanning midnight folds `00:00` of both days into one point.
/// Labels are ordered by their first bucket and only the oldest
/// [`MAX_BUCKET_LABELS`] are kept.
pub fn bucket_samples(samples: &[Sample], granularity: Granularity) -> BucketedSeries {
    let mut buckets: BTreeMap<i64, f64> = BTreeMap::new();
    for sample in samples {
        *buckets
            .entry(granularity.bucket_start(sample.timestamp))
            .or_insert(0.0) += sample.value;
    }

    let mut series = BucketedSeries::default();
    let mut slots: HashMap<String, usize> = HashMap::new();
    for (start, sum) in buckets {
        let label = granularity.label(start);
        if let Some(&slot) = slots.get(&label) {
            series.values[slot] += sum;
        } else if series.labels.len() < MAX_BUCKET_LABELS {
            slots.insert(label.clone(), series.labels.len());
            series.labels.push(label);
            series.values.push(sum);
        }
    }
    series
}

/// Derives a section title from a series key.
///
/// `ts:events:DATA_FETCHED:count` becomes `Data Fetched - Count`.
pub fn series_title(key: &str) -> String {
    let bare = key.strip_prefix(SERIES_PREFIX).unwrap_or(key);
    bare.replace(':', " - ")
        .replace('_', " ")
        .split(' ')
        .map(title_case)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
