// Tally - A fire-and-forget Statsd client for Rust!
//
// Copyright 2015-2021 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::error;
use std::fmt;

/// Trait for metrics to expose Statsd line text.
///
/// Every metric returned by the client is already formatted and includes
/// any prefix the client was configured with.
pub trait Metric {
    fn as_metric_str(&self) -> &str;
}

macro_rules! metric_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(PartialEq, Eq, Debug, Hash, Clone)]
        pub struct $name {
            repr: String,
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name { repr: s }
            }
        }

        impl Metric for $name {
            fn as_metric_str(&self) -> &str {
                &self.repr
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.repr.fmt(f)
            }
        }
    };
}

metric_type!(
    /// Counters are incremented or decremented by the client.
    ///
    /// ``` text
    /// some.counter:1|c
    /// ```
    Counter
);

metric_type!(
    /// Timers are a number of milliseconds between a start and end time.
    ///
    /// ``` text
    /// some.timer:42|ms
    /// ```
    Timer
);

metric_type!(
    /// Gauges are an instantaneous value determined by the client.
    ///
    /// ``` text
    /// some.gauge:1.5|g
    /// ```
    Gauge
);

metric_type!(
    /// Sets count the number of unique values seen by the server.
    ///
    /// ``` text
    /// some.set:7|s
    /// ```
    Set
);

metric_type!(
    /// Raw values are passed through to the server verbatim, optionally
    /// with an epoch timestamp.
    ///
    /// ``` text
    /// some.raw:12934|r|637134848000000000
    /// ```
    Raw
);

/// Potential categories an error from this library falls into.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum ErrorKind {
    /// A metric name, or one of the segments used to build it, was empty
    /// or otherwise unusable.
    InvalidName,
    /// A metric value could not be represented in the Statsd line format.
    InvalidInput,
}

/// Error generated by this library potentially wrapping another
/// type of error.
///
/// Only errors caused by arguments supplied by the caller are ever
/// returned. Failures to resolve or reach the Statsd server are absorbed
/// by the output channel.
#[derive(Debug)]
pub struct MetricError {
    repr: ErrorRepr,
}

#[derive(Debug)]
enum ErrorRepr {
    WithDescription(ErrorKind, &'static str),
    WithDetail(ErrorKind, &'static str, String),
}

impl MetricError {
    /// Return the kind of the error
    pub fn kind(&self) -> ErrorKind {
        match self.repr {
            ErrorRepr::WithDescription(kind, _) => kind,
            ErrorRepr::WithDetail(kind, _, _) => kind,
        }
    }
}

impl fmt::Display for MetricError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.repr {
            ErrorRepr::WithDescription(_, desc) => desc.fmt(f),
            ErrorRepr::WithDetail(_, desc, ref detail) => {
                desc.fmt(f)?;
                f.write_str(": ")?;
                detail.fmt(f)
            }
        }
    }
}

impl error::Error for MetricError {}

impl From<(ErrorKind, &'static str)> for MetricError {
    fn from((kind, desc): (ErrorKind, &'static str)) -> MetricError {
        MetricError {
            repr: ErrorRepr::WithDescription(kind, desc),
        }
    }
}

impl From<(ErrorKind, &'static str, String)> for MetricError {
    fn from((kind, desc, detail): (ErrorKind, &'static str, String)) -> MetricError {
        MetricError {
            repr: ErrorRepr::WithDetail(kind, desc, detail),
        }
    }
}

pub type MetricResult<T> = Result<T, MetricError>;
