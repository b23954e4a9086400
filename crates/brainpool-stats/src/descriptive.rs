/// Summary of a dataset of `f32` values.
///
/// Non-finite values are skipped and counted in `non_finite`, so a diverging
/// loss series still produces a usable summary.
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptiveStats {
    /// Number of finite values summarized.
    pub count: usize,
    /// Number of NaN or infinite values that were skipped.
    pub non_finite: usize,
    pub min: f32,
    pub max: f32,
    pub mean: f32,
    /// Median; the mean of the two middle values for even counts.
    pub median: f32,
    /// Population variance.
    pub variance: f32,
    pub std_dev: f32,
    /// `std_dev / (max - min)`, or `0` when all values are equal.
    pub normalized_std_dev: f32,
}

impl DescriptiveStats {
    /// Summarizes `values`.
    ///
    /// Returns `None` if there is no finite value.
    ///
    /// ```
    /// use brainpool_stats::descriptive::DescriptiveStats;
    ///
    /// let stats = DescriptiveStats::new([4.0, 1.0, f32::NAN, 3.0, 2.0]).unwrap();
    /// assert_eq!(stats.count, 4);
    /// assert_eq!(stats.non_finite, 1);
    /// assert_eq!(stats.min, 1.0);
    /// assert_eq!(stats.max, 4.0);
    /// assert_eq!(stats.mean, 2.5);
    /// assert_eq!(stats.median, 2.5);
    ///
    /// assert!(DescriptiveStats::new([f32::INFINITY]).is_none());
    /// ```
    #[must_use]
    pub fn new<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f32>,
    {
        let mut non_finite = 0;
        let mut values: Vec<f32> = values
            .into_iter()
            .filter(|v| {
                let finite = v.is_finite();
                if !finite {
                    non_finite += 1;
                }
                finite
            })
            .collect();
        values.sort_by(f32::total_cmp);
        let mut stats = Self::from_sorted(&values)?;
        stats.non_finite = non_finite;
        Some(stats)
    }

    /// Summarizes finite values already sorted in ascending order.
    ///
    /// # Panics
    ///
    /// Panics if `sorted_values` is not sorted in ascending order.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn from_sorted(sorted_values: &[f32]) -> Option<Self> {
        assert!(
            sorted_values.is_sorted_by(|a, b| a <= b),
            "values must be sorted in ascending order"
        );

        let min = *sorted_values.first()?;
        let max = *sorted_values.last()?;
        let count = sorted_values.len();
        let n = count as f32;
        let mean = sorted_values.iter().sum::<f32>() / n;
        let mid = count / 2;
        let median = if count % 2 == 0 {
            f32::midpoint(sorted_values[mid - 1], sorted_values[mid])
        } else {
            sorted_values[mid]
        };
        let variance = sorted_values
            .iter()
            .map(|v| (v - mean).powi(2))
            .sum::<f32>()
            / n;
        let std_dev = variance.sqrt();
        let range = max - min;
        let normalized_std_dev = if range > 0.0 { std_dev / range } else { 0.0 };

        Some(Self {
            count,
            non_finite: 0,
            min,
            max,
            mean,
            median,
            variance,
            std_dev,
            normalized_std_dev,
        })
    }
}

/// Streaming mean and variance (Welford's algorithm).
///
/// Used where values arrive one at a time, such as per-batch training losses,
/// and keeping them all would be wasteful.
///
/// ```
/// use brainpool_stats::descriptive::RunningStats;
///
/// let mut stats = RunningStats::default();
/// for v in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
///     stats.push(v);
/// }
/// assert_eq!(stats.count(), 8);
/// assert_eq!(stats.mean(), Some(5.0));
/// assert_eq!(stats.std_dev(), Some(2.0));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f32,
    max: f32,
}

impl RunningStats {
    /// Adds a value. Non-finite values are ignored.
    #[expect(clippy::cast_precision_loss)]
    pub fn push(&mut self, value: f32) {
        if !value.is_finite() {
            return;
        }
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        let x = f64::from(value);
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    #[must_use]
    #[expect(clippy::cast_possible_truncation)]
    pub fn mean(&self) -> Option<f32> {
        (self.count > 0).then_some(self.mean as f32)
    }

    /// Population variance.
    #[must_use]
    #[expect(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn variance(&self) -> Option<f32> {
        (self.count > 0).then(|| (self.m2 / self.count as f64) as f32)
    }

    #[must_use]
    pub fn std_dev(&self) -> Option<f32> {
        self.variance().map(f32::sqrt)
    }

    #[must_use]
    pub fn min(&self) -> Option<f32> {
        (self.count > 0).then_some(self.min)
    }

    #[must_use]
    pub fn max(&self) -> Option<f32> {
        (self.count > 0).then_some(self.max)
    }
}

impl Extend<f32> for RunningStats {
    fn extend<T: IntoIterator<Item = f32>>(&mut self, iter: T) {
        for v in iter {
            self.push(v);
        }
    }
}
