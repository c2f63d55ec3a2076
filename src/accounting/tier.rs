//! Low and normal artificial-cost tiers switched by a threshold.

/// Two-tier artificial cost selection.
///
/// While the monitored value is below `threshold` the `low` tier applies,
/// at or above it the `normal` tier. Without a threshold the normal tier
/// always applies.
///
/// # Examples
///
/// ```
/// use smooth_sim::accounting::tier::CostTier;
///
/// let tier = CostTier::new(Some(0.5), (3.0, 4.0), (1.0, 2.0));
/// assert_eq!(tier.select(0.4), (1.0, 2.0));
/// assert_eq!(tier.select(0.5), (3.0, 4.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostTier<T> {
    pub threshold: Option<f64>,
    pub normal: T,
    pub low: T,
}

impl<T: Copy> CostTier<T> {
    pub fn new(threshold: Option<f64>, normal: T, low: T) -> Self {
        Self {
            threshold,
            normal,
            low,
        }
    }

    pub fn select(&self, value: f64) -> T {
        match self.threshold {
            Some(threshold) if value < threshold => self.low,
            _ => self.normal,
        }
    }
}
