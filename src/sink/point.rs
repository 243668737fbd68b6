/// Time-series point model and InfluxDB line protocol rendering
use std::collections::BTreeMap;
use std::fmt::Write as _;

use time::OffsetDateTime;

use crate::models::AggregatedRecord;
use crate::utils::format_rfc3339;

/// Measurement name every aggregated record is written under
pub const MEASUREMENT: &str = "voltage";

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
}

/// A single timestamped field set
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub measurement: String,
    pub time: OffsetDateTime,
    pub fields: BTreeMap<String, FieldValue>,
}

impl Point {
    /// Build the point for an aggregated record, stamped when the record was built
    pub fn from_record(record: &AggregatedRecord) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert("adc".to_string(), FieldValue::Float(record.avg_adc));
        fields.insert(
            "battery".to_string(),
            FieldValue::Float(record.battery_voltage),
        );
        fields.insert(
            "percent".to_string(),
            FieldValue::Float(record.battery_percent),
        );
        fields.insert(
            "samples".to_string(),
            FieldValue::Integer(record.sample_count as i64),
        );
        fields.insert("x".to_string(), FieldValue::Integer(record.last_x.into()));
        fields.insert("y".to_string(), FieldValue::Integer(record.last_y.into()));
        fields.insert("z".to_string(), FieldValue::Integer(record.last_z.into()));

        Point {
            measurement: MEASUREMENT.to_string(),
            time: record.timestamp,
            fields,
        }
    }

    pub fn timestamp(&self) -> String {
        format_rfc3339(&self.time)
    }

    /// Render as one line of InfluxDB line protocol with nanosecond precision
    ///
    /// Field keys and the measurement name are fixed identifiers without
    /// spaces, commas or equals signs, so no escaping is applied.
    pub fn to_line_protocol(&self) -> String {
        let mut line = self.measurement.clone();
        for (i, (key, value)) in self.fields.iter().enumerate() {
            line.push(if i == 0 { ' ' } else { ',' });
            let _ = match value {
                FieldValue::Float(v) => write!(line, "{key}={v}"),
                FieldValue::Integer(v) => write!(line, "{key}={v}i"),
            };
        }
        let _ = write!(line, " {}", self.time.unix_timestamp_nanos());
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn record(timestamp: OffsetDateTime) -> AggregatedRecord {
        AggregatedRecord {
            avg_adc: 3200.5,
            battery_voltage: 2.8,
            battery_percent: 100.0,
            sample_count: 60,
            last_x: 12,
            last_y: -980,
            last_z: 3,
            timestamp,
        }
    }

    #[test]
    fn carries_every_record_field() {
        let point = Point::from_record(&record(datetime!(2024-01-01 00:00:01 UTC)));
        assert_eq!(point.measurement, "voltage");
        assert_eq!(point.fields.len(), 7);
        assert_eq!(point.fields["adc"], FieldValue::Float(3200.5));
        assert_eq!(point.fields["samples"], FieldValue::Integer(60));
        assert_eq!(point.fields["y"], FieldValue::Integer(-980));
        assert_eq!(point.time, datetime!(2024-01-01 00:00:01 UTC));
        assert_eq!(point.timestamp(), "2024-01-01T00:00:01Z");
    }

    #[test]
    fn renders_line_protocol() {
        let point = Point::from_record(&record(datetime!(1970-01-01 00:00:02 UTC)));
        assert_eq!(
            point.to_line_protocol(),
            "voltage adc=3200.5,battery=2.8,percent=100,samples=60i,x=12i,y=-980i,z=3i 2000000000"
        );
    }
}
