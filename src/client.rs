// Tally - A fire-and-forget Statsd client for Rust!
//
// Copyright 2015-2021 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::builder::{validate_name, MetricFormatter, ToMetricValue};
use crate::channels::{OutputChannel, SendFuture, UdpOutputChannel};
use crate::names::NameBuilder;
use crate::types::{Counter, Gauge, Metric, MetricError, MetricResult, Raw, Set, Timer};
use log::debug;
use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Trait for incrementing and decrementing counters.
///
/// Counters are simple values incremented or decremented by a client. The
/// rates at which these events occur or average values will be determined
/// by the server receiving them. Examples of counter uses include number
/// of logins to a system or requests received.
///
/// See the [Statsd spec](https://github.com/b/statsd_spec) for more
/// information.
pub trait Counted<T>
where
    T: ToMetricValue,
{
    /// Increment or decrement the counter by the given amount
    fn log_count(&self, key: &str, count: T) -> MetricResult<Counter>;
}

/// Trait for convenience methods for counters
///
/// This trait specifically implements increment and decrement convenience
/// methods for counters with `i64` types.
pub trait CountedExt: Counted<i64> {
    /// Increment the counter by 1
    fn incr(&self, key: &str) -> MetricResult<Counter> {
        self.log_count(key, 1)
    }

    /// Decrement the counter by 1
    fn decr(&self, key: &str) -> MetricResult<Counter> {
        self.log_count(key, -1)
    }
}

/// Trait for recording timings in milliseconds.
///
/// Timings are a positive number of milliseconds between a start and end
/// time. Examples include time taken to render a web page or time taken
/// for a database call to return. `Duration` values are converted to
/// milliseconds before being recorded.
///
/// See the [Statsd spec](https://github.com/b/statsd_spec) for more
/// information.
pub trait Timed<T>
where
    T: ToMetricValue,
{
    /// Record a timing in milliseconds with the given key
    fn log_timing(&self, key: &str, time: T) -> MetricResult<Timer>;
}

/// Trait for recording gauge values.
///
/// Gauge values are an instantaneous measurement of a value determined
/// by the client. They do not change unless changed by the client. Examples
/// include things like load average or how many connections are active.
///
/// See the [Statsd spec](https://github.com/b/statsd_spec) for more
/// information.
pub trait Gauged<T>
where
    T: ToMetricValue,
{
    /// Record a gauge value with the given key
    fn log_gauge(&self, key: &str, value: T) -> MetricResult<Gauge>;
}

/// Trait for recording set values.
///
/// Sets count the number of unique elements in a group. You can use them to,
/// for example, count the unique visitors to your site.
pub trait Setted<T>
where
    T: ToMetricValue,
{
    /// Record a single set value with the given key
    fn log_set(&self, key: &str, value: T) -> MetricResult<Set>;
}

/// Trait for recording raw values.
///
/// Raw values are handed to the server as-is, optionally along with the
/// time they were observed. The epoch is an integer tick count chosen by
/// the caller and is rendered as plain decimal text.
pub trait Rawed<T>
where
    T: ToMetricValue,
{
    /// Record a raw value with the given key and optional epoch
    fn log_raw(&self, key: &str, value: T, epoch: Option<i64>) -> MetricResult<Raw>;
}

/// Trait that encompasses all other traits for sending metrics.
///
/// If you wish to use `StatsdClient` with a generic type or place a
/// `StatsdClient` instance behind a pointer (such as a `Box`) this will allow
/// you to reference all the implemented methods for recording metrics, while
/// using a single trait. An example of this is shown below.
///
/// ```
/// use std::time::Duration;
/// use tally::{MetricClient, NopOutputChannel, StatsdClient};
///
/// let client: Box<dyn MetricClient> = Box::new(StatsdClient::from_channel(
///     "prefix", NopOutputChannel));
///
/// client.log_count("some.counter", 1).unwrap();
/// client.incr("some.counter").unwrap();
/// client.log_timing("some.timer", 42).unwrap();
/// client.log_timing("some.timer", Duration::from_millis(42)).unwrap();
/// client.log_gauge("some.gauge", 8).unwrap();
/// client.log_gauge("some.gauge", 8.5).unwrap();
/// client.log_set("some.set", 5).unwrap();
/// client.log_raw("some.raw", 12934, None).unwrap();
/// ```
pub trait MetricClient:
    Counted<i64>
    + CountedExt
    + Timed<u64>
    + Timed<Duration>
    + Gauged<i64>
    + Gauged<f64>
    + Gauged<Decimal>
    + Setted<i64>
    + Rawed<i64>
    + Rawed<f64>
{
}

/// Builder for creating and customizing `StatsdClient` instances.
///
/// Instances of the builder should be created by calling the `::builder()`
/// method on the `StatsdClient` struct.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use tally::prelude::*;
/// use tally::{statsd, MetricError, NopOutputChannel, StatsdClient, DEFAULT_PORT};
///
/// fn my_error_handler(err: MetricError) {
///     println!("Metric error! {}", err);
/// }
///
/// let client = StatsdClient::builder("localhost", DEFAULT_PORT)
///     .with_prefix("my.app")
///     .with_channel(Arc::new(NopOutputChannel))
///     .with_error_handler(my_error_handler)
///     .build();
///
/// client.log_count("something", 123).unwrap();
/// statsd!(client.count().some.counter += 42);
/// ```
pub struct StatsdClientBuilder {
    host: String,
    port: u16,
    prefix: String,
    channel: Option<Arc<dyn OutputChannel>>,
    errors: Box<dyn Fn(MetricError) + Sync + Send>,
}

impl StatsdClientBuilder {
    // Set the required fields and defaults for optional fields
    fn new(host: &str, port: u16) -> Self {
        StatsdClientBuilder {
            // required
            host: host.to_string(),
            port,

            // optional with defaults
            prefix: String::new(),
            channel: None,
            errors: Box::new(nop_error_handler),
        }
    }

    /// Set the prefix prepended to every metric name, followed by a `.`
    ///
    /// Trailing `.` characters are removed from the prefix so that the
    /// delimiter is never doubled: `"foo"`, `"foo."` and `"foo.."` all
    /// become `"foo."`. An empty prefix, or one made only of `.`, means
    /// metric names are emitted as given.
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = Self::formatted_prefix(prefix);
        self
    }

    /// Use the given channel for sending metrics instead of creating a
    /// `UdpOutputChannel` for the host and port of this builder.
    ///
    /// A channel wrapped in an `Arc` can be shared between several clients.
    pub fn with_channel<T>(mut self, channel: T) -> Self
    where
        T: OutputChannel + 'static,
    {
        self.channel = Some(Arc::new(channel));
        self
    }

    /// Set an error handler to use for metrics sent via `NameBuilder::send()`
    /// or recorded by a `TimerGuard` when it's dropped.
    ///
    /// The error handler should consume the error without panicking. The error
    /// may be logged, printed to stderr, discarded, etc. - this is up to the
    /// implementation. Failures to reach the server never end up here.
    pub fn with_error_handler<F>(mut self, errors: F) -> Self
    where
        F: Fn(MetricError) + Sync + Send + 'static,
    {
        self.errors = Box::new(errors);
        self
    }

    /// Construct a new `StatsdClient` instance based on current settings.
    pub fn build(self) -> StatsdClient {
        StatsdClient::from_builder(self)
    }

    // Every trailing delimiter is stripped, not just one, so "foo.." is
    // normalized to "foo." like "foo." is.
    fn formatted_prefix(prefix: &str) -> String {
        let trimmed = prefix.trim_end_matches('.');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("{}.", trimmed)
        }
    }
}

/// Client for Statsd that implements various traits to record metrics.
///
/// # Traits
///
/// The client is the main entry point for users of this library. It supports
/// several traits for recording metrics of different types.
///
/// * `Counted` and `CountedExt` for emitting counters.
/// * `Timed` for emitting timings.
/// * `Gauged` for emitting gauge values.
/// * `Setted` for emitting set values.
/// * `Rawed` for emitting raw values.
/// * `MetricClient` for a combination of all of the above.
///
/// Each of these sends the metric in the thread of the caller and returns
/// it once it has been handed to the output channel. The same operations
/// are available as `log_*_async` methods returning a future that completes
/// once the channel's write attempt has finished. Invalid input is reported
/// before any future is created.
///
/// Metric names can also be composed one segment at a time using the
/// `count()`, `gauge()`, and `timing()` methods or the `statsd!` macro.
///
/// # Failures
///
/// The only errors returned are caused by arguments: an empty metric name or
/// a value that cannot be represented. Failing to resolve or reach the server
/// is never reported to the caller.
///
/// # Threading
///
/// `StatsdClient` is `Send` and `Sync` and can be shared between threads by
/// wrapping it with an `Arc`.
///
/// ``` no_run
/// use std::sync::Arc;
/// use std::thread;
/// use tally::prelude::*;
/// use tally::{StatsdClient, DEFAULT_PORT};
///
/// let client = Arc::new(StatsdClient::builder("metrics.example.com", DEFAULT_PORT)
///     .with_prefix("some.prefix")
///     .build());
///
/// let client_ref = Arc::clone(&client);
/// let t = thread::spawn(move || {
///     client_ref.incr("request.handler").unwrap();
/// });
///
/// t.join().unwrap();
/// ```
pub struct StatsdClient {
    prefix: String,
    channel: Arc<dyn OutputChannel>,
    errors: Box<dyn Fn(MetricError) + Sync + Send>,
}

impl StatsdClient {
    /// Create a new client sending metrics without a prefix to the given
    /// host and port over UDP.
    ///
    /// Creating the client never fails, even if the host can't be resolved.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use tally::prelude::*;
    /// use tally::{StatsdClient, DEFAULT_PORT};
    ///
    /// let client = StatsdClient::new("metrics.example.com", DEFAULT_PORT);
    /// client.log_gauge("some.gauge", 1.5).unwrap();
    /// ```
    pub fn new(host: &str, port: u16) -> Self {
        Self::builder(host, port).build()
    }

    /// Create a new client instance that will use the given prefix for
    /// all metrics emitted to the given `OutputChannel` implementation.
    ///
    /// # Example
    ///
    /// ```
    /// use tally::{NopOutputChannel, StatsdClient};
    ///
    /// let client = StatsdClient::from_channel("my.stats", NopOutputChannel);
    /// ```
    pub fn from_channel<T>(prefix: &str, channel: T) -> Self
    where
        T: OutputChannel + 'static,
    {
        StatsdClientBuilder::new("", 0)
            .with_prefix(prefix)
            .with_channel(channel)
            .build()
    }

    /// Create a new builder for a client sending to the given host and port.
    ///
    /// General defaults:
    ///
    /// * No prefix.
    /// * A `UdpOutputChannel` for the host and port, unless a channel is
    ///   supplied with `with_channel()`.
    /// * A no-op error handler.
    pub fn builder(host: &str, port: u16) -> StatsdClientBuilder {
        StatsdClientBuilder::new(host, port)
    }

    // Create a new StatsdClient by consuming the builder
    fn from_builder(builder: StatsdClientBuilder) -> Self {
        let channel = match builder.channel {
            Some(channel) => channel,
            None => Arc::new(UdpOutputChannel::new(&builder.host, builder.port)),
        };

        debug!("created statsd client with prefix {:?}", builder.prefix);
        StatsdClient {
            prefix: builder.prefix,
            channel,
            errors: builder.errors,
        }
    }

    /// Increment or decrement a counter, returning a future that completes
    /// once the line has been written (or dropped) by the channel.
    ///
    /// # Example
    ///
    /// ```
    /// use tally::{NopOutputChannel, StatsdClient};
    ///
    /// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
    /// let client = StatsdClient::from_channel("my.stats", NopOutputChannel);
    /// client.log_count_async("some.counter", 1)?.await;
    /// # Ok::<(), tally::MetricError>(())
    /// # }).unwrap();
    /// ```
    pub fn log_count_async<T>(&self, key: &str, count: T) -> MetricResult<SendFuture<'_>>
    where
        T: ToMetricValue,
    {
        validate_name(key)?;
        let fmt = MetricFormatter::counter(&self.prefix, key, count.try_to_value()?);
        Ok(self.channel.send_async(fmt.format()))
    }

    /// Record a gauge value, returning a future that completes once the line
    /// has been written (or dropped) by the channel.
    pub fn log_gauge_async<T>(&self, key: &str, value: T) -> MetricResult<SendFuture<'_>>
    where
        T: ToMetricValue,
    {
        validate_name(key)?;
        let fmt = MetricFormatter::gauge(&self.prefix, key, value.try_to_value()?);
        Ok(self.channel.send_async(fmt.format()))
    }

    /// Record a timing in milliseconds, returning a future that completes once
    /// the line has been written (or dropped) by the channel.
    pub fn log_timing_async<T>(&self, key: &str, time: T) -> MetricResult<SendFuture<'_>>
    where
        T: ToMetricValue,
    {
        validate_name(key)?;
        let fmt = MetricFormatter::timer(&self.prefix, key, time.try_to_value()?);
        Ok(self.channel.send_async(fmt.format()))
    }

    /// Record a set value, returning a future that completes once the line
    /// has been written (or dropped) by the channel.
    pub fn log_set_async<T>(&self, key: &str, value: T) -> MetricResult<SendFuture<'_>>
    where
        T: ToMetricValue,
    {
        validate_name(key)?;
        let fmt = MetricFormatter::set(&self.prefix, key, value.try_to_value()?);
        Ok(self.channel.send_async(fmt.format()))
    }

    /// Record a raw value with an optional epoch, returning a future that
    /// completes once the line has been written (or dropped) by the channel.
    pub fn log_raw_async<T>(&self, key: &str, value: T, epoch: Option<i64>) -> MetricResult<SendFuture<'_>>
    where
        T: ToMetricValue,
    {
        validate_name(key)?;
        let fmt = MetricFormatter::raw(&self.prefix, key, value.try_to_value()?, epoch);
        Ok(self.channel.send_async(fmt.format()))
    }

    /// Start timing something, recording the elapsed milliseconds under the
    /// given key when the returned guard is stopped or dropped.
    ///
    /// # Example
    ///
    /// ```
    /// use tally::{SpyOutputChannel, StatsdClient};
    ///
    /// let (rx, channel) = SpyOutputChannel::new();
    /// let client = StatsdClient::from_channel("my.stats", channel);
    ///
    /// {
    ///     let _timer = client.start_timer("db.query").unwrap();
    ///     // ... some work ...
    /// }
    ///
    /// assert!(rx.recv().unwrap().starts_with("my.stats.db.query:"));
    /// ```
    pub fn start_timer(&self, key: &str) -> MetricResult<TimerGuard<'_>> {
        validate_name(key)?;
        Ok(TimerGuard {
            client: self,
            key: key.to_string(),
            start: Instant::now(),
            done: false,
        })
    }

    /// Start composing the name of a counter one segment at a time.
    ///
    /// # Example
    ///
    /// ```
    /// use tally::{SpyOutputChannel, StatsdClient};
    ///
    /// let (rx, channel) = SpyOutputChannel::new();
    /// let client = StatsdClient::from_channel("", channel);
    /// client.count().segment("foo").segment("bar").try_send(1).unwrap();
    ///
    /// assert_eq!("foo.bar:1|c", rx.recv().unwrap());
    /// ```
    pub fn count(&self) -> NameBuilder<'_, Counter> {
        NameBuilder::new(self)
    }

    /// Start composing the name of a gauge one segment at a time.
    pub fn gauge(&self) -> NameBuilder<'_, Gauge> {
        NameBuilder::new(self)
    }

    /// Start composing the name of a timing one segment at a time.
    pub fn timing(&self) -> NameBuilder<'_, Timer> {
        NameBuilder::new(self)
    }

    pub(crate) fn prefix(&self) -> &str {
        &self.prefix
    }

    pub(crate) fn send_metric<M>(&self, fmt: &MetricFormatter<'_>) -> M
    where
        M: Metric + From<String>,
    {
        let line = fmt.format();
        self.channel.send(&line);
        M::from(line)
    }

    pub(crate) fn consume_error(&self, err: MetricError) {
        (self.errors)(err);
    }
}

impl fmt::Debug for StatsdClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StatsdClient {{ prefix: {:?}, channel: ..., errors: ... }}",
            self.prefix,
        )
    }
}

impl<T> Counted<T> for StatsdClient
where
    T: ToMetricValue,
{
    fn log_count(&self, key: &str, count: T) -> MetricResult<Counter> {
        validate_name(key)?;
        let fmt = MetricFormatter::counter(&self.prefix, key, count.try_to_value()?);
        Ok(self.send_metric(&fmt))
    }
}

impl CountedExt for StatsdClient {}

impl<T> Timed<T> for StatsdClient
where
    T: ToMetricValue,
{
    fn log_timing(&self, key: &str, time: T) -> MetricResult<Timer> {
        validate_name(key)?;
        let fmt = MetricFormatter::timer(&self.prefix, key, time.try_to_value()?);
        Ok(self.send_metric(&fmt))
    }
}

impl<T> Gauged<T> for StatsdClient
where
    T: ToMetricValue,
{
    fn log_gauge(&self, key: &str, value: T) -> MetricResult<Gauge> {
        validate_name(key)?;
        let fmt = MetricFormatter::gauge(&self.prefix, key, value.try_to_value()?);
        Ok(self.send_metric(&fmt))
    }
}

impl<T> Setted<T> for StatsdClient
where
    T: ToMetricValue,
{
    fn log_set(&self, key: &str, value: T) -> MetricResult<Set> {
        validate_name(key)?;
        let fmt = MetricFormatter::set(&self.prefix, key, value.try_to_value()?);
        Ok(self.send_metric(&fmt))
    }
}

impl<T> Rawed<T> for StatsdClient
where
    T: ToMetricValue,
{
    fn log_raw(&self, key: &str, value: T, epoch: Option<i64>) -> MetricResult<Raw> {
        validate_name(key)?;
        let fmt = MetricFormatter::raw(&self.prefix, key, value.try_to_value()?, epoch);
        Ok(self.send_metric(&fmt))
    }
}

impl MetricClient for StatsdClient {}

/// Records the time elapsed since it was created as a timing.
///
/// Created by `StatsdClient::start_timer()`. The timing is sent exactly once:
/// either when `stop()` is called or when the guard is dropped. Errors
/// encountered when sending from `drop()` are passed to the error handler of
/// the client.
#[derive(Debug)]
pub struct TimerGuard<'a> {
    client: &'a StatsdClient,
    key: String,
    start: Instant,
    done: bool,
}

impl<'a> TimerGuard<'a> {
    /// Time elapsed since the guard was created.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and send the elapsed time, returning the metric sent.
    pub fn stop(mut self) -> MetricResult<Timer> {
        self.done = true;
        self.client.log_timing(&self.key, self.start.elapsed())
    }
}

impl<'a> Drop for TimerGuard<'a> {
    fn drop(&mut self) {
        if self.done {
            return;
        }

        if let Err(e) = self.client.log_timing(&self.key, self.start.elapsed()) {
            self.client.consume_error(e);
        }
    }
}

#[allow(clippy::needless_pass_by_value)]
fn nop_error_handler(_err: MetricError) {
    // nothing
}
