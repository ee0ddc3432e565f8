//! Per-cell accumulators.
//!
//! A cell aggregate is a running sum of coordinates plus an item count; its
//! reported point is the centroid. The expiring variants bound the aggregate
//! by a trailing time window, evaluated lazily against the injected clock at
//! whole-minute granularity.

use std::collections::VecDeque;
use std::rc::Rc;
use std::time::{Duration, SystemTime};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::point::GeoPoint;
use crate::units::Minutes;

/// A synthetic aggregate point: the centroid of a group of points together
/// with how much weight it carries.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CountPoint {
    pub lat: f64,
    pub lon: f64,
    pub count: f64,
}

impl CountPoint {
    pub fn new(lat: f64, lon: f64, count: f64) -> Self {
        CountPoint { lat, lon, count }
    }
}

/// A running-sum aggregate of the points added to a cell.
///
/// `point()` reports the centroid with the item count; an empty counter
/// reports the zero aggregate rather than dividing by zero. `plus`/`minus`
/// combine sums and counts directly, so merging is associative and a
/// `plus` followed by `minus` of the same counter restores the prior
/// aggregate exactly.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Counter {
    lat_sum: f64,
    lon_sum: f64,
    count: u64,
}

impl Counter {
    pub fn new() -> Self {
        Counter::default()
    }

    pub fn add(&mut self, point: &GeoPoint) {
        self.lat_sum += point.lat;
        self.lon_sum += point.lon;
        self.count += 1;
    }

    pub fn remove(&mut self, point: &GeoPoint) {
        if self.count == 0 {
            return;
        }
        self.lat_sum -= point.lat;
        self.lon_sum -= point.lon;
        self.count -= 1;
        if self.count == 0 {
            self.lat_sum = 0.0;
            self.lon_sum = 0.0;
        }
    }

    pub fn plus(&mut self, other: &Counter) {
        self.lat_sum += other.lat_sum;
        self.lon_sum += other.lon_sum;
        self.count += other.count;
    }

    pub fn minus(&mut self, other: &Counter) {
        self.lat_sum -= other.lat_sum;
        self.lon_sum -= other.lon_sum;
        self.count = self.count.saturating_sub(other.count);
        if self.count == 0 {
            self.lat_sum = 0.0;
            self.lon_sum = 0.0;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn point(&self) -> CountPoint {
        if self.count == 0 {
            return CountPoint::default();
        }
        let n = self.count as f64;
        CountPoint::new(self.lat_sum / n, self.lon_sum / n, n)
    }
}

/// A value-weighted averaging aggregate over [`CountPoint`]s.
///
/// Sums latitudes, longitudes and the carried values; `point()` averages
/// all three. Shares the `plus`/`minus` merge algebra with [`Counter`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AveragingCounter {
    lat_sum: f64,
    lon_sum: f64,
    value_sum: f64,
    count: u64,
}

impl AveragingCounter {
    pub fn new() -> Self {
        AveragingCounter::default()
    }

    pub fn from_point(point: &CountPoint) -> Self {
        let mut counter = AveragingCounter::new();
        counter.add(point);
        counter
    }

    pub fn add(&mut self, point: &CountPoint) {
        self.lat_sum += point.lat;
        self.lon_sum += point.lon;
        self.value_sum += point.count;
        self.count += 1;
    }

    pub fn remove(&mut self, point: &CountPoint) {
        if self.count == 0 {
            return;
        }
        self.lat_sum -= point.lat;
        self.lon_sum -= point.lon;
        self.value_sum -= point.count;
        self.count -= 1;
        if self.count == 0 {
            *self = AveragingCounter::new();
        }
    }

    pub fn plus(&mut self, other: &AveragingCounter) {
        self.lat_sum += other.lat_sum;
        self.lon_sum += other.lon_sum;
        self.value_sum += other.value_sum;
        self.count += other.count;
    }

    pub fn minus(&mut self, other: &AveragingCounter) {
        self.lat_sum -= other.lat_sum;
        self.lon_sum -= other.lon_sum;
        self.value_sum -= other.value_sum;
        self.count = self.count.saturating_sub(other.count);
        if self.count == 0 {
            *self = AveragingCounter::new();
        }
    }

    pub fn point(&self) -> CountPoint {
        if self.count == 0 {
            return CountPoint::default();
        }
        let n = self.count as f64;
        CountPoint::new(self.lat_sum / n, self.lon_sum / n, self.value_sum / n)
    }
}

/// One minute's worth of contributions.
#[derive(Debug, Clone)]
struct MinuteBucket {
    start: SystemTime,
    lat_sum: f64,
    lon_sum: f64,
    count: u64,
}

/// A [`Counter`] bounded by a trailing time window.
///
/// Contributions are folded into minute-aligned buckets; a bucket's
/// contributions stop counting once the whole-minute age of the bucket
/// strictly exceeds the window. Expired buckets are dropped on mutation;
/// reads sum the live buckets without restructuring.
pub struct ExpiringCounter {
    buckets: VecDeque<MinuteBucket>,
    expiration: Minutes,
    clock: Rc<dyn Clock>,
}

impl ExpiringCounter {
    pub fn new(expiration: Minutes, clock: Rc<dyn Clock>) -> Self {
        ExpiringCounter {
            buckets: VecDeque::new(),
            expiration,
            clock,
        }
    }

    fn minute_floor(instant: SystemTime) -> SystemTime {
        let since_epoch = instant
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default();
        SystemTime::UNIX_EPOCH + Duration::from_secs(since_epoch.as_secs() / 60 * 60)
    }

    fn has_expired(&self, bucket_start: SystemTime) -> bool {
        let age = self
            .clock
            .now()
            .duration_since(bucket_start)
            .unwrap_or_default();
        age.as_secs() / 60 > self.expiration.get()
    }

    fn purge(&mut self) {
        while let Some(front) = self.buckets.front() {
            if !self.has_expired(front.start) {
                break;
            }
            self.buckets.pop_front();
        }
    }

    pub fn add(&mut self, point: &GeoPoint) {
        self.purge();

        let minute = Self::minute_floor(self.clock.now());
        match self.buckets.back_mut() {
            Some(bucket) if bucket.start == minute => {
                bucket.lat_sum += point.lat;
                bucket.lon_sum += point.lon;
                bucket.count += 1;
            }
            _ => self.buckets.push_back(MinuteBucket {
                start: minute,
                lat_sum: point.lat,
                lon_sum: point.lon,
                count: 1,
            }),
        }
    }

    /// Best-effort retraction: subtracts the point from the newest live
    /// bucket, saturating at zero. Supports move semantics for windowed
    /// cells; a contribution whose bucket has already expired needs no
    /// retraction.
    pub fn remove(&mut self, point: &GeoPoint) {
        self.purge();

        if let Some(bucket) = self.buckets.back_mut() {
            if bucket.count > 0 {
                bucket.lat_sum -= point.lat;
                bucket.lon_sum -= point.lon;
                bucket.count -= 1;
                if bucket.count == 0 {
                    bucket.lat_sum = 0.0;
                    bucket.lon_sum = 0.0;
                }
            }
        }
    }

    fn live_buckets(&self) -> impl Iterator<Item = &MinuteBucket> + '_ {
        self.buckets
            .iter()
            .filter(|bucket| !self.has_expired(bucket.start))
    }

    /// Number of contributions still inside the window.
    pub fn count(&self) -> u64 {
        self.live_buckets().map(|bucket| bucket.count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// The windowed centroid aggregate, or the zero aggregate when nothing
    /// is live.
    pub fn point(&self) -> CountPoint {
        let mut folded = Counter::new();
        for bucket in self.live_buckets() {
            folded.plus(&Counter {
                lat_sum: bucket.lat_sum,
                lon_sum: bucket.lon_sum,
                count: bucket.count,
            });
        }
        folded.point()
    }
}

/// Independent trailing-window counts per secondary key.
///
/// Routes each contribution to an [`ExpiringCounter`] keyed by the point's
/// id, for cells whose aggregate must be broken down per contributor.
pub struct ExpiringMultiCounter {
    counters: FxHashMap<String, ExpiringCounter>,
    expiration: Minutes,
    clock: Rc<dyn Clock>,
}

impl ExpiringMultiCounter {
    pub fn new(expiration: Minutes, clock: Rc<dyn Clock>) -> Self {
        ExpiringMultiCounter {
            counters: FxHashMap::default(),
            expiration,
            clock,
        }
    }

    pub fn add(&mut self, point: &GeoPoint) {
        let expiration = self.expiration;
        let clock = Rc::clone(&self.clock);
        self.counters
            .entry(point.id.clone())
            .or_insert_with(|| ExpiringCounter::new(expiration, clock))
            .add(point);
    }

    pub fn remove(&mut self, point: &GeoPoint) {
        if let Some(counter) = self.counters.get_mut(&point.id) {
            counter.remove(point);
        }
    }

    /// The live count for one key.
    pub fn count(&self, key: &str) -> u64 {
        self.counters
            .get(key)
            .map(ExpiringCounter::count)
            .unwrap_or(0)
    }

    /// Live, non-zero counts per key.
    pub fn counts(&self) -> FxHashMap<String, u64> {
        self.counters
            .iter()
            .filter_map(|(key, counter)| {
                let count = counter.count();
                (count > 0).then(|| (key.clone(), count))
            })
            .collect()
    }

    /// The sum of all live counts.
    pub fn total(&self) -> u64 {
        self.counters.values().map(ExpiringCounter::count).sum()
    }
}
