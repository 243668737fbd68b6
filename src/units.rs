/// Conversion of raw battery ADC counts into physical units
///
/// The constants describe the sensor board's battery divider: a 12-bit ADC
/// against a 1.769 V reference, measuring the battery through a 0.49 divider.
const ADC_REFERENCE_VOLTS: f64 = 1.769;
const ADC_FULL_SCALE: f64 = 4096.0;
const DIVIDER_RATIO: f64 = 0.49;

// Charge curve: per-cell voltage 1.1 V is empty, each 2.73 mV adds one percent
const CELL_EMPTY_VOLTS: f64 = 1.1;
const VOLTS_PER_PERCENT: f64 = 0.00273;

/// Convert an ADC count (or an average of counts) into battery voltage
pub fn adc_to_voltage(adc: f64) -> f64 {
    adc * ADC_REFERENCE_VOLTS / ADC_FULL_SCALE / DIVIDER_RATIO
}

/// Convert battery voltage into a charge percentage, saturating at 0 and 100
pub fn voltage_to_percentage(voltage: f64) -> f64 {
    ((voltage / 2.0 - CELL_EMPTY_VOLTS) / VOLTS_PER_PERCENT).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaling_constants_round_trip_to_one_volt() {
        let adc = ADC_FULL_SCALE * DIVIDER_RATIO / ADC_REFERENCE_VOLTS;
        assert!((adc_to_voltage(adc) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_counts_is_zero_volts() {
        assert_eq!(adc_to_voltage(0.0), 0.0);
    }

    #[test]
    fn percentage_is_clamped() {
        for v in [-1e9, -3.0, 0.0, 1.0, 2.2, 2.5, 2.75, 3.0, 10.0, 1e9] {
            let pct = voltage_to_percentage(v);
            assert!((0.0..=100.0).contains(&pct), "{v} -> {pct}");
        }
        assert_eq!(voltage_to_percentage(f64::NEG_INFINITY), 0.0);
        assert_eq!(voltage_to_percentage(f64::INFINITY), 100.0);
    }

    #[test]
    fn percentage_is_monotonic() {
        let mut previous = voltage_to_percentage(-5.0);
        let mut v = -5.0;
        while v < 5.0 {
            v += 0.001;
            let pct = voltage_to_percentage(v);
            assert!(pct >= previous, "{v}: {pct} < {previous}");
            previous = pct;
        }
    }

    #[test]
    fn percentage_inside_charge_curve() {
        // 2.2 V is empty, 2.2 + 0.546 V is full
        assert_eq!(voltage_to_percentage(2.2), 0.0);
        assert!((voltage_to_percentage(2.2 + 2.0 * 0.00273 * 50.0) - 50.0).abs() < 1e-9);
        assert_eq!(voltage_to_percentage(2.8), 100.0);
    }
}
