// Tally - A fire-and-forget Statsd client for Rust!
//
// Copyright 2015-2021 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Future returned by the asynchronous send methods.
///
/// It resolves once the underlying write attempt has completed. Since
/// failures are absorbed by the channel, there is nothing to return.
pub type SendFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChannelStats {
    pub bytes_sent: u64,
    pub packets_sent: u64,
    pub bytes_dropped: u64,
    pub packets_dropped: u64,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct SocketStats {
    bytes_sent: Arc<AtomicU64>,
    packets_sent: Arc<AtomicU64>,
    bytes_dropped: Arc<AtomicU64>,
    packets_dropped: Arc<AtomicU64>,
}

impl SocketStats {
    fn incr_bytes_sent(&self, n: u64) {
        self.bytes_sent.fetch_add(n, Ordering::Relaxed);
    }

    fn incr_packets_sent(&self) {
        self.packets_sent.fetch_add(1, Ordering::Relaxed);
    }

    fn incr_bytes_dropped(&self, n: u64) {
        self.bytes_dropped.fetch_add(n, Ordering::Relaxed);
    }

    fn incr_packets_dropped(&self) {
        self.packets_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a line that never made it to a socket.
    pub(crate) fn dropped(&self, len: usize) {
        self.incr_bytes_dropped(len as u64);
        self.incr_packets_dropped();
    }

    /// Record the outcome of a write and discard any error.
    ///
    /// This is the point where transport failures stop: the result is
    /// counted and then thrown away.
    pub(crate) fn absorb(&self, res: io::Result<usize>, len: usize) {
        match res {
            Ok(written) => {
                self.incr_bytes_sent(written as u64);
                self.incr_packets_sent();
            }
            Err(_) => self.dropped(len),
        }
    }
}

impl From<&SocketStats> for ChannelStats {
    fn from(stats: &SocketStats) -> Self {
        ChannelStats {
            bytes_sent: stats.bytes_sent.load(Ordering::Relaxed),
            packets_sent: stats.packets_sent.load(Ordering::Relaxed),
            bytes_dropped: stats.bytes_dropped.load(Ordering::Relaxed),
            packets_dropped: stats.packets_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Trait for destinations that Statsd lines are sent to.
///
/// Each line is a complete metric in the canonical format, without a
/// trailing newline, and must be transmitted as a single unit (one UDP
/// datagram for the default channel). Examples of each supported metric
/// type are given below.
///
/// ## Counter
///
/// ``` text
/// some.counter:123|c
/// ```
///
/// ## Timer
///
/// ``` text
/// some.timer:456|ms
/// ```
///
/// ## Gauge
///
/// ``` text
/// some.gauge:5|g
/// ```
///
/// ## Set
///
/// ``` text
/// some.set:2|s
/// ```
///
/// ## Raw
///
/// ``` text
/// some.raw:12934|r|637134848000000000
/// ```
///
/// Implementations must never panic or return errors for transport
/// problems such as unresolvable hosts or unreachable servers. Those are
/// silently dropped (and optionally counted in `stats()`). Channels are
/// shared between threads and may be invoked concurrently.
pub trait OutputChannel: Send + Sync {
    /// Send the line, blocking the caller for as long as the write takes.
    fn send(&self, line: &str);

    /// Send the line, returning a future that completes once the write
    /// attempt is done.
    ///
    /// The default implementation performs the blocking `send` when the
    /// future is first polled.
    fn send_async<'a>(&'a self, line: String) -> SendFuture<'a> {
        Box::pin(async move { self.send(&line) })
    }

    /// Return I/O telemetry like bytes / packets sent or dropped.
    ///
    /// Note that not all channels implement this method and the default
    /// implementation returns zeros.
    fn stats(&self) -> ChannelStats {
        ChannelStats::default()
    }
}

impl<T> OutputChannel for Arc<T>
where
    T: OutputChannel + ?Sized,
{
    fn send(&self, line: &str) {
        (**self).send(line)
    }

    fn send_async<'a>(&'a self, line: String) -> SendFuture<'a> {
        (**self).send_async(line)
    }

    fn stats(&self) -> ChannelStats {
        (**self).stats()
    }
}

/// Implementation of an `OutputChannel` that discards all lines.
///
/// Useful for disabling metric collection or unit tests.
#[derive(Debug, Clone)]
pub struct NopOutputChannel;

impl OutputChannel for NopOutputChannel {
    fn send(&self, _line: &str) {}
}

#[cfg(test)]
mod tests {
    use super::{ChannelStats, NopOutputChannel, OutputChannel, SocketStats};
    use std::io;
    use std::sync::Arc;

    #[test]
    fn test_nop_output_channel() {
        let channel = NopOutputChannel;
        channel.send("baz:4|c");
        assert_eq!(ChannelStats::default(), channel.stats());
    }

    #[test]
    fn test_shared_output_channel() {
        let channel: Arc<dyn OutputChannel> = Arc::new(NopOutputChannel);
        let shared = Arc::clone(&channel);
        shared.send("baz:4|c");
        assert_eq!(ChannelStats::default(), shared.stats());
    }

    #[test]
    fn test_socket_stats_absorb() {
        let stats = SocketStats::default();
        stats.absorb(Ok(7), 7);
        stats.absorb(Err(io::Error::from(io::ErrorKind::Other)), 9);
        stats.dropped(3);

        let snapshot = ChannelStats::from(&stats);
        assert_eq!(7, snapshot.bytes_sent);
        assert_eq!(1, snapshot.packets_sent);
        assert_eq!(12, snapshot.bytes_dropped);
        assert_eq!(2, snapshot.packets_dropped);
    }
}
