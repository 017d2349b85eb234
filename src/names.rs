// Tally - A fire-and-forget Statsd client for Rust!
//
// Copyright 2020-2021 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::builder::{MetricFormatter, MetricType, ToMetricValue};
use crate::client::StatsdClient;
use crate::types::{Counter, ErrorKind, Gauge, Metric, MetricError, MetricResult, Timer};
use std::fmt;
use std::marker::PhantomData;

/// Metric types a `NameBuilder` can be bound to.
pub trait NamedMetric: Metric + From<String> {
    #[doc(hidden)]
    fn metric_type() -> MetricType;
}

impl NamedMetric for Counter {
    fn metric_type() -> MetricType {
        MetricType::Count
    }
}

impl NamedMetric for Gauge {
    fn metric_type() -> MetricType {
        MetricType::Gauge
    }
}

impl NamedMetric for Timer {
    fn metric_type() -> MetricType {
        MetricType::Timing
    }
}

/// Builder for composing a metric name one segment at a time and sending
/// a single value under it.
///
/// Instances are created by the `count()`, `gauge()`, and `timing()` methods
/// of `StatsdClient` and are usually driven by the `statsd!` macro. Segments
/// are joined with `.` and prefixed with the prefix of the client.
///
/// Problems with segments are not reported until the metric is sent:
/// `try_send()` returns them while `send()` passes them to the error handler
/// of the client. Sending consumes the builder.
///
/// # Example
///
/// ```
/// use tally::{SpyOutputChannel, StatsdClient};
///
/// let (rx, channel) = SpyOutputChannel::new();
/// let client = StatsdClient::from_channel("my.app", channel);
///
/// client.gauge()
///     .segment("pool")
///     .literal("db-primary")
///     .segment("active")
///     .end()
///     .try_send(12)
///     .unwrap();
///
/// assert_eq!("my.app.pool.db-primary.active:12|g", rx.recv().unwrap());
/// ```
#[must_use = "Did you forget to call .send() after adding segments?"]
pub struct NameBuilder<'c, M>
where
    M: NamedMetric,
{
    client: &'c StatsdClient,
    name: String,
    error: Option<MetricError>,
    type_: PhantomData<M>,
}

impl<'c, M> NameBuilder<'c, M>
where
    M: NamedMetric,
{
    pub(crate) fn new(client: &'c StatsdClient) -> Self {
        NameBuilder {
            client,
            name: String::new(),
            error: None,
            type_: PhantomData,
        }
    }

    /// Append a segment spelled like an identifier: ASCII letters, digits,
    /// and `_` only.
    pub fn segment(mut self, name: &str) -> Self {
        if is_identifier(name) {
            self.push(name);
        } else {
            self.fail(MetricError::from((
                ErrorKind::InvalidName,
                "Metric name segment is not a valid identifier",
                name.to_string(),
            )));
        }
        self
    }

    /// Append a segment that can't be spelled as an identifier.
    ///
    /// Any non-empty text is accepted as long as it does not contain the
    /// `.` delimiter.
    pub fn literal(mut self, text: &str) -> Self {
        if text.is_empty() || text.contains('.') {
            self.fail(MetricError::from((
                ErrorKind::InvalidName,
                "Literal metric name segment must be non-empty without '.'",
                text.to_string(),
            )));
        } else {
            self.push(text);
        }
        self
    }

    /// Mark the end of the name. Adds nothing.
    pub fn end(self) -> Self {
        self
    }

    /// Send the metric under the composed name, returning it or the first
    /// problem encountered while composing the name.
    pub fn try_send<T>(self, value: T) -> MetricResult<M>
    where
        T: ToMetricValue,
    {
        if let Some(e) = self.error {
            return Err(e);
        }

        if self.name.is_empty() {
            return Err(MetricError::from((
                ErrorKind::InvalidName,
                "Metric name must have at least one segment",
            )));
        }

        let val = value.try_to_value()?;
        let fmt = MetricFormatter::from_val(self.client.prefix(), &self.name, val, M::metric_type());
        Ok(self.client.send_metric(&fmt))
    }

    /// Send the metric under the composed name, passing any error to the
    /// error handler of the client.
    pub fn send<T>(self, value: T)
    where
        T: ToMetricValue,
    {
        let client = self.client;
        if let Err(e) = self.try_send(value) {
            client.consume_error(e);
        }
    }

    fn push(&mut self, segment: &str) {
        if !self.name.is_empty() {
            self.name.push('.');
        }
        self.name.push_str(segment);
    }

    // Keep the first error, later ones are usually caused by it.
    fn fail(&mut self, err: MetricError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }
}

impl<'c, M> fmt::Debug for NameBuilder<'c, M>
where
    M: NamedMetric,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NameBuilder {{ type: {}, name: {:?}, error: {:?} }}",
            M::metric_type(),
            self.name,
            self.error,
        )
    }
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::is_identifier;
    use crate::channels::{NopOutputChannel, SpyOutputChannel};
    use crate::client::StatsdClient;
    use crate::types::{ErrorKind, Metric, MetricError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("foo"));
        assert!(is_identifier("foo_bar2"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("foo.bar"));
        assert!(!is_identifier("foo-bar"));
        assert!(!is_identifier("föö"));
    }

    #[test]
    fn test_name_builder_segments() {
        let client = StatsdClient::from_channel("", NopOutputChannel);
        let res = client.count().segment("foo").segment("bar").try_send(1);

        assert_eq!("foo.bar:1|c", res.unwrap().as_metric_str());
    }

    #[test]
    fn test_name_builder_prefix() {
        let client = StatsdClient::from_channel("prefix", NopOutputChannel);
        let res = client.timing().segment("foo").try_send(1);

        assert_eq!("prefix.foo:1|ms", res.unwrap().as_metric_str());
    }

    #[test]
    fn test_name_builder_literal_and_end() {
        let client = StatsdClient::from_channel("", NopOutputChannel);
        let res = client.gauge().segment("foo").literal("bar").end().try_send(1);

        assert_eq!("foo.bar:1|g", res.unwrap().as_metric_str());
    }

    #[test]
    fn test_name_builder_literal_not_identifier() {
        let client = StatsdClient::from_channel("", NopOutputChannel);
        let res = client.count().literal("http-500").literal("GET /").try_send(2);

        assert_eq!("http-500.GET /:2|c", res.unwrap().as_metric_str());
    }

    #[test]
    fn test_name_builder_no_segments() {
        let client = StatsdClient::from_channel("prefix", NopOutputChannel);
        let res = client.count().end().try_send(1);

        assert_eq!(ErrorKind::InvalidName, res.unwrap_err().kind());
    }

    #[test]
    fn test_name_builder_invalid_segment() {
        let client = StatsdClient::from_channel("", NopOutputChannel);
        let res = client.count().segment("foo.bar").segment("baz").try_send(1);

        let err = res.unwrap_err();
        assert_eq!(ErrorKind::InvalidName, err.kind());
        assert!(err.to_string().contains("foo.bar"));
    }

    #[test]
    fn test_name_builder_invalid_literal() {
        let client = StatsdClient::from_channel("", NopOutputChannel);

        let empty = client.count().segment("foo").literal("").try_send(1);
        let dotted = client.count().segment("foo").literal("a.b").try_send(1);

        assert_eq!(ErrorKind::InvalidName, empty.unwrap_err().kind());
        assert_eq!(ErrorKind::InvalidName, dotted.unwrap_err().kind());
    }

    #[test]
    fn test_name_builder_invalid_value() {
        let client = StatsdClient::from_channel("", NopOutputChannel);
        let res = client.gauge().segment("foo").try_send(f32::NAN);

        assert_eq!(ErrorKind::InvalidInput, res.unwrap_err().kind());
    }

    #[test]
    fn test_name_builder_send_error_handler() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_ref = count.clone();

        let handler = move |_err: MetricError| {
            count_ref.fetch_add(1, Ordering::Release);
        };

        let (rx, channel) = SpyOutputChannel::new();
        let client = StatsdClient::builder("localhost", 8125)
            .with_channel(channel)
            .with_error_handler(handler)
            .build();

        client.count().segment("bad.segment").send(1);
        client.count().segment("good").send(1);

        assert_eq!(1, count.load(Ordering::Acquire));
        assert_eq!("good:1|c", rx.recv().unwrap());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_name_builder_debug() {
        let client = StatsdClient::from_channel("", NopOutputChannel);
        let builder = client.timing().segment("foo").segment("bar");

        assert!(format!("{:?}", builder).contains("foo.bar"));
    }
}
