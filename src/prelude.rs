// Tally - A fire-and-forget Statsd client for Rust!
//
// Copyright 2015-2021 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Export commonly used parts of Tally for easy glob imports
//!
//! # Example
//!
//! ```
//! use tally::prelude::*;
//! use tally::{NopOutputChannel, StatsdClient};
//!
//! let client = StatsdClient::from_channel("some.prefix", NopOutputChannel);
//!
//! client.log_count("some.counter", 1).unwrap();
//! client.incr("some.counter").unwrap();
//! client.log_timing("some.timer", 23).unwrap();
//! client.log_gauge("some.gauge", 45).unwrap();
//! client.log_set("some.set", 123).unwrap();
//! client.log_raw("some.raw", 67, None).unwrap();
//! ```

pub use crate::channels::OutputChannel;
pub use crate::client::{Counted, CountedExt, Gauged, MetricClient, Rawed, Setted, Timed};
pub use crate::types::Metric;
