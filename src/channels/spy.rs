// Tally - A fire-and-forget Statsd client for Rust!
//
// Copyright 2020-2021 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::channels::core::{ChannelStats, OutputChannel, SocketStats};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use std::io::{self, ErrorKind};

/// `OutputChannel` implementation that writes every line to the `Sender` half
/// of a channel while callers are given ownership of the `Receiver` half.
///
/// This is not a general purpose channel, rather it's meant for verifying
/// lines written during the course of tests. By default, the queue used is
/// unbounded. The queue size can be limited using the `with_capacity` method,
/// in which case lines sent while it is full are dropped like any other
/// transport failure.
///
/// Each line is sent to the underlying queue when the `.send()` method is
/// called, in the thread of the caller.
///
/// # Example
///
/// ```
/// use tally::prelude::*;
/// use tally::{SpyOutputChannel, StatsdClient};
///
/// let (rx, channel) = SpyOutputChannel::new();
/// let client = StatsdClient::from_channel("my.prefix", channel);
/// client.incr("some.counter").unwrap();
///
/// assert_eq!("my.prefix.some.counter:1|c", rx.recv().unwrap());
/// ```
#[derive(Debug)]
pub struct SpyOutputChannel {
    sender: Sender<String>,
    stats: SocketStats,
}

impl SpyOutputChannel {
    /// Create a new `SpyOutputChannel` backed by an unbounded queue, returning
    /// the `Receiver` half of the queue along with the channel.
    pub fn new() -> (Receiver<String>, Self) {
        Self::with_queue_capacity(None)
    }

    /// Create a new `SpyOutputChannel` backed by a queue holding at most
    /// `queue` lines, returning the `Receiver` half of the queue along with
    /// the channel. Lines sent while the queue is full are dropped.
    pub fn with_capacity(queue: usize) -> (Receiver<String>, Self) {
        Self::with_queue_capacity(Some(queue))
    }

    fn with_queue_capacity(queue: Option<usize>) -> (Receiver<String>, Self) {
        let (tx, rx) = new_channel(queue);
        let channel = SpyOutputChannel {
            sender: tx,
            stats: SocketStats::default(),
        };
        (rx, channel)
    }
}

impl OutputChannel for SpyOutputChannel {
    fn send(&self, line: &str) {
        self.stats.absorb(send_line(&self.sender, line), line.len());
    }

    fn stats(&self) -> ChannelStats {
        (&self.stats).into()
    }
}

fn new_channel(cap: Option<usize>) -> (Sender<String>, Receiver<String>) {
    if let Some(sz) = cap {
        bounded(sz)
    } else {
        unbounded()
    }
}

fn send_line(sender: &Sender<String>, line: &str) -> io::Result<usize> {
    match sender.try_send(line.to_string()) {
        Err(TrySendError::Disconnected(_)) => Err(io::Error::new(ErrorKind::Other, "channel disconnected")),
        Err(TrySendError::Full(_)) => Err(io::Error::new(ErrorKind::Other, "channel full")),
        Ok(_) => Ok(line.len()),
    }
}
