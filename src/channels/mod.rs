// Tally - A fire-and-forget Statsd client for Rust!
//
// Copyright 2015-2021 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

mod core;
mod log;
mod spy;
mod udp;

pub use crate::channels::core::{ChannelStats, NopOutputChannel, OutputChannel, SendFuture};
pub use crate::channels::log::LoggingOutputChannel;
pub use crate::channels::spy::SpyOutputChannel;
pub use crate::channels::udp::UdpOutputChannel;
