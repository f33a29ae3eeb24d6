//! Sample accumulators.

/// z-value of the two-sided 99.9% confidence interval.
pub const Z_99_9: f64 = 3.291;

/// List of observed values of a single metric.
///
/// All accessors are defined for an empty sample and return `0.0` in this case.
#[derive(Clone, Debug, Default)]
pub struct SampleMetric {
    data: Vec<f64>,
}

impl SampleMetric {
    pub fn add(&mut self, x: f64) {
        self.data.push(x);
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.data
    }

    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    pub fn mean(&self) -> f64 {
        if self.data.is_empty() {
            return 0.;
        }
        self.sum() / (self.data.len() as f64)
    }

    /// Sample standard deviation (with Bessel's correction). Zero for less than two values.
    pub fn stdev(&self) -> f64 {
        if self.data.len() < 2 {
            return 0.;
        }
        let mean = self.mean();
        let squares: f64 = self.data.iter().map(|x| (x - mean) * (x - mean)).sum();
        (squares / (self.data.len() - 1) as f64).sqrt()
    }

    /// Half-width of the 99.9% confidence interval of the mean.
    pub fn confidence_half_width(&self) -> f64 {
        if self.data.is_empty() {
            return 0.;
        }
        Z_99_9 * self.stdev() / (self.data.len() as f64).sqrt()
    }
}
