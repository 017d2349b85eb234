// Tally - A fire-and-forget Statsd client for Rust!
//
// Copyright 2018 Philip Jenvey <pjenvey@mozilla.com>
// Copyright 2018-2021 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::types::{ErrorKind, MetricError, MetricResult};
use rust_decimal::Decimal;
use std::fmt::{self, Write};
use std::time::Duration;

/// Type of metric that knows how to display itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Count,
    Gauge,
    Timing,
    Set,
    Raw,
}

impl MetricType {
    /// Suffix used for this type of metric in the Statsd line format.
    pub fn suffix(self) -> &'static str {
        match self {
            MetricType::Count => "c",
            MetricType::Gauge => "g",
            MetricType::Timing => "ms",
            MetricType::Set => "s",
            MetricType::Raw => "r",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.suffix().fmt(f)
    }
}

/// Holder for primitive metric values that knows how to display itself
///
/// Values are always rendered the same way regardless of the locale of the
/// machine: no grouping separators, `.` as the decimal point, and never in
/// scientific notation. Each float width keeps its own shortest round-trip
/// representation, so `1.5f32`, `1.5f64`, and a decimal `1.5` all render as
/// `1.5`.
///
/// Typical use shouldn't require interacting with this type directly, see
/// `ToMetricValue`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Signed(i64),
    Unsigned(u64),
    Float32(f32),
    Float(f64),
    Decimal(Decimal),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MetricValue::Signed(v) => v.fmt(f),
            MetricValue::Unsigned(v) => v.fmt(f),
            MetricValue::Float32(v) => v.fmt(f),
            MetricValue::Float(v) => v.fmt(f),
            MetricValue::Decimal(v) => v.normalize().fmt(f),
        }
    }
}

/// Conversion trait for valid values of metrics
///
/// Implemented for `i32`, `i64`, `u32`, `u64`, `f32`, `f64`, `Decimal`, and
/// `Duration` (converted to whole milliseconds). Floats that are NaN or
/// infinite cannot be parsed by a Statsd server and are rejected with an
/// `InvalidInput` error.
pub trait ToMetricValue {
    fn try_to_value(self) -> MetricResult<MetricValue>;
}

impl ToMetricValue for i32 {
    fn try_to_value(self) -> MetricResult<MetricValue> {
        Ok(MetricValue::Signed(i64::from(self)))
    }
}

impl ToMetricValue for i64 {
    fn try_to_value(self) -> MetricResult<MetricValue> {
        Ok(MetricValue::Signed(self))
    }
}

impl ToMetricValue for u32 {
    fn try_to_value(self) -> MetricResult<MetricValue> {
        Ok(MetricValue::Unsigned(u64::from(self)))
    }
}

impl ToMetricValue for u64 {
    fn try_to_value(self) -> MetricResult<MetricValue> {
        Ok(MetricValue::Unsigned(self))
    }
}

impl ToMetricValue for f32 {
    fn try_to_value(self) -> MetricResult<MetricValue> {
        if self.is_finite() {
            Ok(MetricValue::Float32(self))
        } else {
            Err(non_finite(self.to_string()))
        }
    }
}

impl ToMetricValue for f64 {
    fn try_to_value(self) -> MetricResult<MetricValue> {
        if self.is_finite() {
            Ok(MetricValue::Float(self))
        } else {
            Err(non_finite(self.to_string()))
        }
    }
}

impl ToMetricValue for Decimal {
    fn try_to_value(self) -> MetricResult<MetricValue> {
        Ok(MetricValue::Decimal(self))
    }
}

impl ToMetricValue for Duration {
    fn try_to_value(self) -> MetricResult<MetricValue> {
        let as_millis = self.as_millis();
        if as_millis > u64::MAX as u128 {
            Err(MetricError::from((ErrorKind::InvalidInput, "u64 overflow")))
        } else {
            Ok(MetricValue::Unsigned(as_millis as u64))
        }
    }
}

fn non_finite(val: String) -> MetricError {
    MetricError::from((ErrorKind::InvalidInput, "Value is not a finite number", val))
}

/// Return an error if the name can't be used for a metric.
pub(crate) fn validate_name(key: &str) -> MetricResult<()> {
    if key.is_empty() {
        Err(MetricError::from((ErrorKind::InvalidName, "Metric name must not be empty")))
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct MetricFormatter<'a> {
    prefix: &'a str,
    key: &'a str,
    val: MetricValue,
    type_: MetricType,
    epoch: Option<i64>,
}

impl<'a> MetricFormatter<'a> {
    pub(crate) fn counter(prefix: &'a str, key: &'a str, val: MetricValue) -> Self {
        Self::from_val(prefix, key, val, MetricType::Count)
    }

    pub(crate) fn timer(prefix: &'a str, key: &'a str, val: MetricValue) -> Self {
        Self::from_val(prefix, key, val, MetricType::Timing)
    }

    pub(crate) fn gauge(prefix: &'a str, key: &'a str, val: MetricValue) -> Self {
        Self::from_val(prefix, key, val, MetricType::Gauge)
    }

    pub(crate) fn set(prefix: &'a str, key: &'a str, val: MetricValue) -> Self {
        Self::from_val(prefix, key, val, MetricType::Set)
    }

    pub(crate) fn raw(prefix: &'a str, key: &'a str, val: MetricValue, epoch: Option<i64>) -> Self {
        MetricFormatter {
            epoch,
            ..Self::from_val(prefix, key, val, MetricType::Raw)
        }
    }

    pub(crate) fn from_val(prefix: &'a str, key: &'a str, val: MetricValue, type_: MetricType) -> Self {
        MetricFormatter {
            prefix,
            key,
            val,
            type_,
            epoch: None,
        }
    }

    #[rustfmt::skip]
    fn size_hint(&self) -> usize {
        let epoch = if self.epoch.is_some() { 1 /* | */ + 20 /* i64 */ } else { 0 };
        self.prefix.len() + self.key.len() + 1 /* : */ + 10 /* value */ + 1 /* | */ + 2 /* type */ + epoch
    }

    pub(crate) fn format(&self) -> String {
        let mut metric_string = String::with_capacity(self.size_hint());
        let _ = write!(metric_string, "{}{}:{}|{}", self.prefix, self.key, self.val, self.type_);
        if let Some(epoch) = self.epoch {
            let _ = write!(metric_string, "|{}", epoch);
        }
        metric_string
    }
}

#[cfg(test)]
mod tests {
    use super::{validate_name, MetricFormatter, MetricType, MetricValue, ToMetricValue};
    use crate::types::ErrorKind;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use std::time::Duration;

    #[test]
    fn test_metric_type_suffixes() {
        assert_eq!("c", MetricType::Count.to_string());
        assert_eq!("g", MetricType::Gauge.to_string());
        assert_eq!("ms", MetricType::Timing.to_string());
        assert_eq!("s", MetricType::Set.to_string());
        assert_eq!("r", MetricType::Raw.to_string());
    }

    #[test]
    fn test_metric_value_same_text_for_all_numeric_kinds() {
        let values = vec![
            1.5f32.try_to_value().unwrap(),
            1.5f64.try_to_value().unwrap(),
            Decimal::from_str("1.5").unwrap().try_to_value().unwrap(),
            Decimal::from_str("1.500").unwrap().try_to_value().unwrap(),
        ];

        for v in values {
            assert_eq!("1.5", v.to_string());
        }
    }

    #[test]
    fn test_metric_value_f32_keeps_short_representation() {
        assert_eq!("0.1", 0.1f32.try_to_value().unwrap().to_string());
    }

    #[test]
    fn test_metric_value_no_scientific_notation() {
        assert_eq!("0.0000001", 1e-7f64.try_to_value().unwrap().to_string());
        assert_eq!("10000000000000000", 1e16f64.try_to_value().unwrap().to_string());
    }

    #[test]
    fn test_metric_value_whole_float_and_integers() {
        assert_eq!("2", 2.0f64.try_to_value().unwrap().to_string());
        assert_eq!("-12", (-12i32).try_to_value().unwrap().to_string());
        assert_eq!("1000000", 1_000_000u64.try_to_value().unwrap().to_string());
    }

    #[test]
    fn test_metric_value_non_finite() {
        assert_eq!(ErrorKind::InvalidInput, f64::NAN.try_to_value().unwrap_err().kind());
        assert_eq!(ErrorKind::InvalidInput, f32::INFINITY.try_to_value().unwrap_err().kind());
    }

    #[test]
    fn test_metric_value_duration() {
        let val = Duration::from_micros(157_900).try_to_value().unwrap();
        assert_eq!(MetricValue::Unsigned(157), val);
    }

    #[test]
    fn test_metric_value_duration_overflow() {
        let res = Duration::from_secs(u64::MAX).try_to_value();
        assert_eq!(ErrorKind::InvalidInput, res.unwrap_err().kind());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("some.stat").is_ok());
        assert_eq!(ErrorKind::InvalidName, validate_name("").unwrap_err().kind());
    }

    #[test]
    fn test_metric_formatter_counter() {
        let fmt = MetricFormatter::counter("prefix.", "some.key", MetricValue::Signed(4));
        assert_eq!("prefix.some.key:4|c", &fmt.format());
    }

    #[test]
    fn test_metric_formatter_counter_no_prefix() {
        let fmt = MetricFormatter::counter("", "some.key", MetricValue::Signed(-1));
        assert_eq!("some.key:-1|c", &fmt.format());
    }

    #[test]
    fn test_metric_formatter_timer() {
        let fmt = MetricFormatter::timer("prefix.", "some.method", MetricValue::Unsigned(21));
        assert_eq!("prefix.some.method:21|ms", &fmt.format());
    }

    #[test]
    fn test_metric_formatter_gauge_float() {
        let fmt = MetricFormatter::gauge("prefix.", "load.avg", MetricValue::Float(2.5));
        assert_eq!("prefix.load.avg:2.5|g", &fmt.format());
    }

    #[test]
    fn test_metric_formatter_set() {
        let fmt = MetricFormatter::set("prefix.", "users.uniques", MetricValue::Signed(44));
        assert_eq!("prefix.users.uniques:44|s", &fmt.format());
    }

    #[test]
    fn test_metric_formatter_raw_no_epoch() {
        let fmt = MetricFormatter::raw("", "my.raw.stat", MetricValue::Signed(12934), None);
        assert_eq!("my.raw.stat:12934|r", &fmt.format());
    }

    #[test]
    fn test_metric_formatter_raw_with_epoch() {
        let fmt = MetricFormatter::raw("", "my.raw.stat", MetricValue::Signed(12934), Some(637_134_848_000_000_000));
        assert_eq!("my.raw.stat:12934|r|637134848000000000", &fmt.format());
    }
}
