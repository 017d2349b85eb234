// Tally - A fire-and-forget Statsd client for Rust!
//
// Copyright 2015-2016 TSH Labs
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::channels::core::OutputChannel;
use log::{log, Level};

/// Implementation of an `OutputChannel` that emits lines using the `log!` macro.
///
/// Lines are emitted using the `Level` provided at construction with a target
/// of `metrics`. Useful for local development when no Statsd server is around.
#[derive(Debug, Clone)]
pub struct LoggingOutputChannel {
    level: Level,
}

impl LoggingOutputChannel {
    /// Create a new `LoggingOutputChannel` that logs every line at `level`.
    pub fn new(level: Level) -> Self {
        LoggingOutputChannel { level }
    }
}

impl Default for LoggingOutputChannel {
    fn default() -> Self {
        Self::new(Level::Info)
    }
}

impl OutputChannel for LoggingOutputChannel {
    fn send(&self, line: &str) {
        log!(target: "metrics", self.level, "{}", line);
    }
}
