/// Batching of ADC samples into averaged records
use time::OffsetDateTime;

use crate::models::{AggregatedRecord, DecodedSample};
use crate::units::{adc_to_voltage, voltage_to_percentage};

/// Number of samples averaged into one record
pub const BATCH_THRESHOLD: usize = 60;

/// Accumulates ADC readings and emits one record per full window
///
/// There is no time-based flush: a window that never fills never emits.
/// The buffer outlives connection sessions so a transient drop does not
/// discard a partial window.
#[derive(Debug)]
pub struct Aggregator {
    samples: Vec<u16>,
    last_axes: (i16, i16, i16),
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl Aggregator {
    pub fn new() -> Self {
        Aggregator {
            samples: Vec::with_capacity(BATCH_THRESHOLD),
            last_axes: (0, 0, 0),
        }
    }

    /// Number of samples waiting in the current window
    pub fn pending(&self) -> usize {
        self.samples.len()
    }

    /// Add a sample, returning a record when the window fills
    pub fn add(&mut self, sample: &DecodedSample) -> Option<AggregatedRecord> {
        self.samples.push(sample.adc);
        self.last_axes = (sample.x, sample.y, sample.z);

        if self.samples.len() < BATCH_THRESHOLD {
            return None;
        }

        let sample_count = self.samples.len();
        let sum: u64 = self.samples.iter().map(|&adc| adc as u64).sum();
        let avg_adc = sum as f64 / sample_count as f64;
        self.samples.clear();

        let battery_voltage = adc_to_voltage(avg_adc);
        let (last_x, last_y, last_z) = self.last_axes;

        Some(AggregatedRecord {
            avg_adc,
            battery_voltage,
            battery_percent: voltage_to_percentage(battery_voltage),
            sample_count,
            last_x,
            last_y,
            last_z,
            timestamp: OffsetDateTime::now_utc(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(adc: u16, x: i16) -> DecodedSample {
        DecodedSample { adc, x, y: -x, z: 0 }
    }

    #[test]
    fn emits_mean_of_full_window() {
        let mut aggregator = Aggregator::new();
        let values: Vec<u16> = (0..60).map(|i| 2000 + i * 7).collect();
        let mean = values.iter().map(|&v| v as f64).sum::<f64>() / 60.0;

        let mut records = Vec::new();
        for (i, &v) in values.iter().enumerate() {
            if let Some(record) = aggregator.add(&sample(v, i as i16)) {
                records.push(record);
            }
        }

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.sample_count, 60);
        assert!((record.avg_adc - mean).abs() < 1e-9);
        assert_eq!(record.battery_voltage, adc_to_voltage(mean));
        assert_eq!(
            record.battery_percent,
            voltage_to_percentage(record.battery_voltage)
        );
        assert_eq!((record.last_x, record.last_y, record.last_z), (59, -59, 0));
        assert_eq!(aggregator.pending(), 0);
    }

    #[test]
    fn fifty_nine_samples_emit_nothing() {
        let mut aggregator = Aggregator::new();
        for _ in 0..59 {
            assert!(aggregator.add(&sample(1000, 1)).is_none());
        }
        assert_eq!(aggregator.pending(), 59);
        assert!(aggregator.add(&sample(1000, 1)).is_some());
    }

    #[test]
    fn window_restarts_after_emission() {
        let mut aggregator = Aggregator::new();
        for _ in 0..60 {
            aggregator.add(&sample(100, 0));
        }
        assert!(aggregator.add(&sample(4000, 3)).is_none());
        assert_eq!(aggregator.pending(), 1);

        let mut second = None;
        for _ in 0..59 {
            second = aggregator.add(&sample(4000, 3));
        }
        let record = second.expect("second window should emit");
        assert_eq!(record.avg_adc, 4000.0);
        assert_eq!(record.sample_count, 60);
    }

    #[test]
    fn large_counts_do_not_overflow() {
        let mut aggregator = Aggregator::new();
        let mut record = None;
        for _ in 0..60 {
            record = aggregator.add(&sample(u16::MAX, 0));
        }
        assert_eq!(record.unwrap().avg_adc, u16::MAX as f64);
    }
}
