// Tally - A fire-and-forget Statsd client for Rust!
//
// Copyright 2020-2021 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

/// Emit a metric whose name is spelled as a chain of field accesses
///
/// The expression starts with a client, given as a variable or a field
/// path such as `self.client`, and one of its `count()`, `gauge()`, or
/// `timing()` methods, continues with any number of `.segment` accesses,
/// and ends by adding a value with `+=`. Each `.segment` becomes one
/// segment of the metric name. Segments that aren't valid identifiers can
/// be given with `._("literal")`, and a lone `._` marks the end of the name
/// without adding anything.
///
/// The metric is sent in the thread of the caller. Any errors are handled
/// by the error handler registered with the client.
///
/// # Examples
///
/// ```
/// use tally::{statsd, SpyOutputChannel, StatsdClient};
///
/// let (rx, channel) = SpyOutputChannel::new();
/// let client = StatsdClient::from_channel("my.prefix", channel);
///
/// // "my.prefix.foo.bar:1|c"
/// statsd!(client.count().foo.bar += 1);
/// // "my.prefix.foo.bar:1|ms"
/// statsd!(client.timing().foo._("bar")._ += 1);
/// // "my.prefix.pool.db-01.size:2.5|g"
/// statsd!(client.gauge().pool._("db-01").size += 2.5);
///
/// assert_eq!("my.prefix.foo.bar:1|c", rx.recv().unwrap());
/// assert_eq!("my.prefix.foo.bar:1|ms", rx.recv().unwrap());
/// assert_eq!("my.prefix.pool.db-01.size:2.5|g", rx.recv().unwrap());
/// ```
#[macro_export]
macro_rules! statsd {
    (@acc $builder:expr ; . _ ( $lit:expr ) $($rest:tt)*) => {
        $crate::statsd!(@acc $builder.literal($lit) ; $($rest)*)
    };

    (@acc $builder:expr ; . _ $($rest:tt)*) => {
        $crate::statsd!(@acc $builder.end() ; $($rest)*)
    };

    (@acc $builder:expr ; . $seg:ident $($rest:tt)*) => {
        $crate::statsd!(@acc $builder.segment(stringify!($seg)) ; $($rest)*)
    };

    (@acc $builder:expr ; += $val:expr) => {
        $builder.send($val)
    };

    ($head:ident $(. $path:ident)* () $($rest:tt)*) => {
        $crate::statsd!(@acc $head $(. $path)* () ; $($rest)*)
    };
}

#[cfg(test)]
mod tests {
    use crate::channels::SpyOutputChannel;
    use crate::client::StatsdClient;
    use crate::types::MetricError;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_statsd_macro_segments() {
        let (rx, channel) = SpyOutputChannel::new();
        let client = StatsdClient::from_channel("", channel);

        statsd!(client.count().foo.bar += 1);
        statsd!(client.gauge().foo += 2.5);
        statsd!(client.timing().foo.bar.baz += 10u64);

        assert_eq!("foo.bar:1|c", rx.recv().unwrap());
        assert_eq!("foo:2.5|g", rx.recv().unwrap());
        assert_eq!("foo.bar.baz:10|ms", rx.recv().unwrap());
    }

    #[test]
    fn test_statsd_macro_literal_and_end() {
        let (rx, channel) = SpyOutputChannel::new();
        let client = StatsdClient::from_channel("", channel);

        statsd!(client.timing().foo._("bar")._ += 1);
        statsd!(client.count()._("status-200").total += 3);

        assert_eq!("foo.bar:1|ms", rx.recv().unwrap());
        assert_eq!("status-200.total:3|c", rx.recv().unwrap());
    }

    #[test]
    fn test_statsd_macro_decimal_value() {
        let (rx, channel) = SpyOutputChannel::new();
        let client = StatsdClient::from_channel("", channel);

        statsd!(client.gauge().foo += Decimal::new(25, 1));

        assert_eq!("foo:2.5|g", rx.recv().unwrap());
    }

    #[test]
    fn test_statsd_macro_errors_go_to_handler() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_ref = count.clone();

        let (rx, channel) = SpyOutputChannel::new();
        let client = StatsdClient::builder("localhost", 8125)
            .with_channel(channel)
            .with_error_handler(move |_e: MetricError| {
                count_ref.fetch_add(1, Ordering::Release);
            })
            .build();

        statsd!(client.count()._("a.b") += 1);

        assert_eq!(1, count.load(Ordering::Acquire));
        assert!(rx.try_recv().is_err());
    }

    struct Handler {
        client: StatsdClient,
    }

    impl Handler {
        fn handle(&self) {
            statsd!(self.client.count().requests.handled += 1);
        }
    }

    struct State {
        stats: Handler,
    }

    #[test]
    fn test_statsd_macro_client_field_path() {
        let (rx, channel) = SpyOutputChannel::new();
        let state = State {
            stats: Handler {
                client: StatsdClient::from_channel("app", channel),
            },
        };

        state.stats.handle();
        statsd!(state.stats.client.gauge().pool._("db-01") += 4);

        assert_eq!("app.requests.handled:1|c", rx.recv().unwrap());
        assert_eq!("app.pool.db-01:4|g", rx.recv().unwrap());
    }
}
