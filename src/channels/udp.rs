// Tally - A fire-and-forget Statsd client for Rust!
//
// Copyright 2015-2021 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use log::{debug, trace};
use tokio::runtime::Handle;

use crate::channels::core::{ChannelStats, OutputChannel, SendFuture, SocketStats};

// Minimum time between attempts to resolve a host that previously failed
// to resolve.
const DEFAULT_RESOLVE_INTERVAL: Duration = Duration::from_secs(30);

/// Pick a single address out of everything a host resolved to, preferring
/// one from the same family as the local socket.
fn pick_addr<I>(addrs: I, ipv4: bool) -> io::Result<SocketAddr>
where
    I: Iterator<Item = SocketAddr>,
{
    let mut first = None;
    for addr in addrs {
        if addr.is_ipv4() == ipv4 {
            return Ok(addr);
        }
        first = first.or(Some(addr));
    }

    first.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "No socket addresses yielded"))
}

/// Attempt to convert anything implementing the `ToSocketAddrs` trait
/// into a concrete `SocketAddr` instance.
fn get_addr<A: ToSocketAddrs>(addr: A, ipv4: bool) -> io::Result<SocketAddr> {
    pick_addr(addr.to_socket_addrs()?, ipv4)
}

enum Lookup {
    Ready(SocketAddr),
    Resolve,
    Skip,
}

#[derive(Debug, Default)]
struct Resolved {
    addr: Option<SocketAddr>,
    last_failure: Option<Instant>,
}

/// Host and port of the Statsd server, resolved lazily on first use.
#[derive(Debug)]
struct Destination {
    host: String,
    port: u16,
    ipv4: bool,
    interval: Duration,
    state: Mutex<Resolved>,
}

impl Destination {
    fn new(host: &str, port: u16, ipv4: bool) -> Self {
        Destination {
            host: host.to_string(),
            port,
            ipv4,
            interval: DEFAULT_RESOLVE_INTERVAL,
            state: Mutex::new(Resolved::default()),
        }
    }

    // The lock is never held during a lookup. Callers racing an unfinished
    // lookup resolve on their own, only a completed failure backs them off.
    fn lookup(&self) -> Lookup {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(addr) = state.addr {
            return Lookup::Ready(addr);
        }

        match state.last_failure {
            Some(last) if last.elapsed() < self.interval => Lookup::Skip,
            _ => Lookup::Resolve,
        }
    }

    fn store(&self, res: io::Result<SocketAddr>) -> Option<SocketAddr> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match res {
            Ok(addr) => {
                debug!("resolved statsd host {}:{} to {}", self.host, self.port, addr);
                state.addr = Some(addr);
                Some(addr)
            }
            Err(e) => {
                debug!("unable to resolve statsd host {}:{}: {}", self.host, self.port, e);
                // A success from a concurrent lookup wins.
                if state.addr.is_none() {
                    state.last_failure = Some(Instant::now());
                }
                state.addr
            }
        }
    }

    fn resolve(&self) -> Option<SocketAddr> {
        match self.lookup() {
            Lookup::Ready(addr) => Some(addr),
            Lookup::Skip => None,
            Lookup::Resolve => self.store(get_addr((self.host.as_str(), self.port), self.ipv4)),
        }
    }

    // Resolution runs on the blocking pool of the current runtime, which
    // exists whether or not the I/O driver is enabled.
    async fn resolve_async(&self) -> Option<SocketAddr> {
        match self.lookup() {
            Lookup::Ready(addr) => Some(addr),
            Lookup::Skip => None,
            Lookup::Resolve => {
                let res = match tokio::net::lookup_host((self.host.as_str(), self.port)).await {
                    Ok(addrs) => pick_addr(addrs, self.ipv4),
                    Err(e) => Err(e),
                };
                self.store(res)
            }
        }
    }
}

/// Implementation of an `OutputChannel` that emits lines over UDP.
///
/// Each line is sent as its own datagram to the Statsd server. Creating
/// the channel never fails: the host is resolved the first time a line
/// is sent and any problem resolving or reaching it results in the line
/// being dropped. Dropped lines are visible in `stats()` and nowhere else.
///
/// Every line is written to a non-blocking `std::net::UdpSocket`, so a
/// send never waits on the network. Asynchronous sends polled from within
/// a Tokio runtime resolve the host without blocking the runtime, and
/// behave exactly like blocking sends otherwise. The socket is not tied to
/// any runtime, so one channel can be shared across runtimes, including
/// ones built without an I/O driver.
///
/// # Example
///
/// ```no_run
/// use tally::{OutputChannel, UdpOutputChannel, DEFAULT_PORT};
///
/// let channel = UdpOutputChannel::new("metrics.example.com", DEFAULT_PORT);
/// channel.send("some.counter:1|c");
/// ```
#[derive(Debug)]
pub struct UdpOutputChannel {
    destination: Destination,
    socket: Option<UdpSocket>,
    stats: SocketStats,
}

impl UdpOutputChannel {
    /// Construct a new `UdpOutputChannel` that sends to the given host and
    /// port from an ephemeral local port.
    ///
    /// If a local socket can't be created, the channel is still returned
    /// but drops every line sent to it.
    pub fn new(host: &str, port: u16) -> Self {
        let socket = UdpSocket::bind("0.0.0.0:0").and_then(|s| {
            s.set_nonblocking(true)?;
            Ok(s)
        });

        Self::from_parts(host, port, socket.ok())
    }

    /// Construct a new `UdpOutputChannel` that sends to the given host and
    /// port using an already bound socket.
    ///
    /// The socket is put into non-blocking mode.
    pub fn from_socket(host: &str, port: u16, socket: UdpSocket) -> Self {
        let socket = match socket.set_nonblocking(true) {
            Ok(_) => Some(socket),
            Err(_) => None,
        };

        Self::from_parts(host, port, socket)
    }

    fn from_parts(host: &str, port: u16, socket: Option<UdpSocket>) -> Self {
        let ipv4 = socket
            .as_ref()
            .and_then(|s| s.local_addr().ok())
            .map_or(true, |a| a.is_ipv4());

        debug!("sending statsd metrics to {}:{} over udp", host, port);
        UdpOutputChannel {
            destination: Destination::new(host, port, ipv4),
            socket,
            stats: SocketStats::default(),
        }
    }

    /// Set how long to wait before resolving the host again after a
    /// failed attempt. Defaults to 30 seconds.
    pub fn with_resolve_interval(mut self, interval: Duration) -> Self {
        self.destination.interval = interval;
        self
    }

    fn write(&self, socket: &UdpSocket, addr: Option<SocketAddr>, line: &str) {
        match addr {
            Some(addr) => self.stats.absorb(socket.send_to(line.as_bytes(), addr), line.len()),
            None => self.stats.dropped(line.len()),
        }
    }
}

impl OutputChannel for UdpOutputChannel {
    fn send(&self, line: &str) {
        match self.socket {
            Some(ref socket) => self.write(socket, self.destination.resolve(), line),
            None => self.stats.dropped(line.len()),
        }
    }

    fn send_async<'a>(&'a self, line: String) -> SendFuture<'a> {
        Box::pin(async move {
            let socket = match self.socket {
                Some(ref socket) => socket,
                None => return self.stats.dropped(line.len()),
            };

            if Handle::try_current().is_err() {
                trace!("no tokio runtime, resolving statsd host in the calling thread");
                return self.write(socket, self.destination.resolve(), &line);
            }

            let addr = self.destination.resolve_async().await;
            self.write(socket, addr, &line);
        })
    }

    fn stats(&self) -> ChannelStats {
        (&self.stats).into()
    }
}
