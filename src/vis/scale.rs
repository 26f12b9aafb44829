use chrono::{DateTime, Utc};

/// Min and max of an iterator, or None when empty.
pub fn extent<T: PartialOrd + Copy>(values: impl IntoIterator<Item = T>) -> Option<(T, T)> {
    values.into_iter().fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((if v < lo { v } else { lo }, if v > hi { v } else { hi })),
    })
}

/// Continuous linear mapping. A zero-width domain maps to the middle of
/// the range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    domain: (f64, f64),
    range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    pub fn apply(&self, value: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        let t = if d1 == d0 { 0.5 } else { (value - d0) / (d1 - d0) };
        r0 + t * (r1 - r0)
    }

    pub fn invert(&self, x: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if r1 == r0 {
            return (d0 + d1) / 2.0;
        }
        d0 + (x - r0) / (r1 - r0) * (d1 - d0)
    }

    /// Extend the domain to round tick values, as d3's `linear.nice`.
    pub fn nice(mut self, count: usize) -> Self {
        let (mut i0, mut i1) = (0, 1);
        let mut d = [self.domain.0, self.domain.1];
        if d[1] < d[0] {
            std::mem::swap(&mut i0, &mut i1);
        }
        let (mut start, mut stop) = (d[i0], d[i1]);
        if !(start.is_finite() && stop.is_finite()) || start == stop {
            return self;
        }

        let mut prestep = None;
        for _ in 0..10 {
            let step = tick_increment(start, stop, count);
            if prestep == Some(step) {
                d[i0] = start;
                d[i1] = stop;
                self.domain = (d[0], d[1]);
                return self;
            } else if step > 0.0 {
                start = (start / step).floor() * step;
                stop = (stop / step).ceil() * step;
            } else if step < 0.0 {
                start = (start * step).ceil() / step;
                stop = (stop * step).floor() / step;
            } else {
                break;
            }
            prestep = Some(step);
        }
        self
    }
}

fn tick_increment(start: f64, stop: f64, count: usize) -> f64 {
    let e10 = 50f64.sqrt();
    let e5 = 10f64.sqrt();
    let e2 = 2f64.sqrt();

    let step = (stop - start) / count.max(1) as f64;
    let power = step.log10().floor();
    let error = step / 10f64.powf(power);
    let factor = if error >= e10 {
        10.0
    } else if error >= e5 {
        5.0
    } else if error >= e2 {
        2.0
    } else {
        1.0
    };
    if power < 0.0 {
        -(10f64.powf(-power)) / factor
    } else {
        factor * 10f64.powf(power)
    }
}

/// Linear scale over UTC timestamps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeScale {
    inner: LinearScale,
}

impl TimeScale {
    pub fn new(domain: (DateTime<Utc>, DateTime<Utc>), range: (f64, f64)) -> Self {
        let d = (
            domain.0.timestamp_millis() as f64,
            domain.1.timestamp_millis() as f64,
        );
        Self {
            inner: LinearScale::new(d, range),
        }
    }

    /// Scale over the extent of `times`, None when there are none.
    pub fn from_times(times: &[DateTime<Utc>], range: (f64, f64)) -> Option<Self> {
        extent(times.iter().copied()).map(|d| Self::new(d, range))
    }

    pub fn apply(&self, time: DateTime<Utc>) -> f64 {
        self.inner.apply(time.timestamp_millis() as f64)
    }
}

/// Ordinal scale of `n` evenly spaced bands, as d3's `scaleBand` with
/// outer padding 0 and center alignment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandScale {
    n: usize,
    start: f64,
    step: f64,
    bandwidth: f64,
}

impl BandScale {
    pub fn new(n: usize, range: (f64, f64), padding_inner: f64, round: bool) -> Self {
        let (lo, hi) = if range.1 < range.0 { (range.1, range.0) } else { range };
        let mut step = (hi - lo) / (n as f64 - padding_inner).max(1.0);
        if round {
            step = step.floor();
        }
        let mut start = lo + (hi - lo - step * (n as f64 - padding_inner)) * 0.5;
        let mut bandwidth = step * (1.0 - padding_inner);
        if round {
            start = start.round();
            bandwidth = bandwidth.round();
        }
        Self {
            n,
            start,
            step,
            bandwidth,
        }
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn apply(&self, i: usize) -> f64 {
        self.start + self.step * i as f64
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }
}
