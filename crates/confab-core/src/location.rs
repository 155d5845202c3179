//! Device location attached to outgoing messages.

use serde::{Deserialize, Serialize};

/// A location fix supplied by the user's device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy in meters
    pub accuracy: f64,
}

impl LocationFix {
    /// Creates a fix, rejecting coordinates outside the WGS84 range.
    pub fn new(latitude: f64, longitude: f64, accuracy: f64) -> Option<Self> {
        let valid = (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude)
            && accuracy.is_finite()
            && accuracy >= 0.0;
        valid.then_some(Self {
            latitude,
            longitude,
            accuracy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_fix() {
        let fix = LocationFix::new(35.68, 139.76, 12.0).unwrap();
        assert_eq!(fix.latitude, 35.68);
    }

    #[test]
    fn test_out_of_range_fix_is_rejected() {
        assert!(LocationFix::new(91.0, 0.0, 5.0).is_none());
        assert!(LocationFix::new(0.0, -181.0, 5.0).is_none());
        assert!(LocationFix::new(0.0, 0.0, -1.0).is_none());
        assert!(LocationFix::new(f64::NAN, 0.0, 1.0).is_none());
    }
}
