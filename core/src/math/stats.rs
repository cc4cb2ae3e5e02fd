pub struct StatsHelper;

impl StatsHelper {
    /// Median of the values; the two middle values are averaged for even lengths.
    pub fn median(samples: &[f64]) -> Option<f64> {
        if samples.is_empty() {
            return None;
        }
        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 1 {
            Some(sorted[mid])
        } else {
            Some((sorted[mid - 1] + sorted[mid]) / 2.0)
        }
    }

    /// Median absolute deviation around `median`.
    pub fn mad(samples: &[f64], median: f64) -> Option<f64> {
        let deviations: Vec<f64> = samples.iter().map(|v| (v - median).abs()).collect();
        Self::median(&deviations)
    }

    /// Median and MAD, with a zero (or undefined) MAD replaced by `floor`.
    pub fn median_and_mad(samples: &[f64], floor: f64) -> Option<(f64, f64)> {
        let median = Self::median(samples)?;
        let mad = match Self::mad(samples, median) {
            Some(mad) if mad > 0.0 => mad,
            _ => floor,
        };
        Some((median, mad))
    }
}
