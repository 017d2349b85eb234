// Tally - A fire-and-forget Statsd client for Rust!
//
// Copyright 2015-2021 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A fire-and-forget Statsd client for Rust!
//!
//! Tally formats counters, gauges, timings, sets, and raw values as Statsd
//! lines and hands each one to an output channel, by default a UDP socket.
//! Sending a metric never fails because the server is missing or
//! unreachable: only invalid arguments are reported back to the caller.
//!
//! ## Features
//!
//! * Counters, timers, gauges, sets, and raw values with an optional epoch.
//! * Blocking and asynchronous (Tokio) sending of every metric type.
//! * Composing metric names one segment at a time with `NameBuilder` or
//!   the `statsd!` macro.
//! * Alternate destinations via the `OutputChannel` trait.
//!
//! ## Install
//!
//! To make use of `tally` in your project, add it as a dependency in your `Cargo.toml` file.
//!
//! ```toml
//! [dependencies]
//! tally = "x.y.z"
//! ```
//!
//! ## Usage
//!
//! ### Simple Use
//!
//! Create a client that sends to some imaginary metrics server and emit a
//! few metrics. The host is resolved the first time a metric is sent.
//!
//! ```rust,no_run
//! use tally::prelude::*;
//! use tally::{StatsdClient, DEFAULT_PORT};
//!
//! let client = StatsdClient::builder("metrics.example.com", DEFAULT_PORT)
//!     .with_prefix("my.metrics")
//!     .build();
//!
//! // Emit metrics!
//! client.incr("some.counter").unwrap();
//! client.log_timing("some.methodCall", 42).unwrap();
//! client.log_gauge("some.thing", 7.5).unwrap();
//! client.log_raw("some.raw", 12934, Some(637_134_848_000_000_000)).unwrap();
//! ```
//!
//! ### Asynchronous Use
//!
//! Every metric type can also be sent asynchronously. Invalid arguments are
//! reported immediately, before any future is created, and the future
//! completes once the line has been written or dropped.
//!
//! ```rust,no_run
//! use tally::{StatsdClient, DEFAULT_PORT};
//!
//! # async fn example() -> tally::MetricResult<()> {
//! let client = StatsdClient::new("metrics.example.com", DEFAULT_PORT);
//!
//! client.log_count_async("some.counter", 1)?.await;
//! client.log_gauge_async("some.gauge", 2.5)?.await;
//! # Ok(())
//! # }
//! ```
//!
//! ### Composing Names
//!
//! Hierarchical names can be spelled without building strings by hand.
//!
//! ```rust
//! use tally::{statsd, SpyOutputChannel, StatsdClient};
//!
//! let (rx, channel) = SpyOutputChannel::new();
//! let client = StatsdClient::from_channel("my.prefix", channel);
//!
//! statsd!(client.count().requests.api._("v2")._ += 1);
//! client.timing().segment("db").segment("query").send(12);
//!
//! assert_eq!("my.prefix.requests.api.v2:1|c", rx.recv().unwrap());
//! assert_eq!("my.prefix.db.query:12|ms", rx.recv().unwrap());
//! ```
//!
//! ### Custom Channels
//!
//! Metrics can be sent somewhere other than a Statsd server by implementing
//! the `OutputChannel` trait. Implementations should never panic and should
//! silently drop lines they can't deliver.
//!
//! ```rust
//! use std::sync::Mutex;
//! use tally::prelude::*;
//! use tally::StatsdClient;
//!
//! #[derive(Default)]
//! struct CollectingChannel {
//!     lines: Mutex<Vec<String>>,
//! }
//!
//! impl OutputChannel for CollectingChannel {
//!     fn send(&self, line: &str) {
//!         if let Ok(mut lines) = self.lines.lock() {
//!             lines.push(line.to_string());
//!         }
//!     }
//! }
//!
//! let client = StatsdClient::from_channel("my.prefix", CollectingChannel::default());
//! client.incr("some.counter").unwrap();
//! ```

#![forbid(unsafe_code)]

pub const DEFAULT_PORT: u16 = 8125;

pub use self::builder::{MetricType, MetricValue, ToMetricValue};
pub use self::channels::{
    ChannelStats, LoggingOutputChannel, NopOutputChannel, OutputChannel, SendFuture, SpyOutputChannel, UdpOutputChannel,
};
pub use self::client::{
    Counted, CountedExt, Gauged, MetricClient, Rawed, Setted, StatsdClient, StatsdClientBuilder, Timed, TimerGuard,
};
pub use self::names::{NameBuilder, NamedMetric};
pub use self::types::{Counter, ErrorKind, Gauge, Metric, MetricError, MetricResult, Raw, Set, Timer};

mod builder;
mod channels;
mod client;
#[macro_use]
mod macros;
mod names;
pub mod prelude;
mod types;
