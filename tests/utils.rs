use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tally::prelude::*;
use tally::{SendFuture, StatsdClient};

#[allow(dead_code)]
pub const NUM_THREADS: u64 = 100;
#[allow(dead_code)]
pub const NUM_ITERATIONS: u64 = 1_000;

#[allow(dead_code)]
pub fn run_arc_threaded_test(client: StatsdClient, num_threads: u64, iterations: u64) {
    let shared_client = Arc::new(client);

    let threads: Vec<_> = (0..num_threads)
        .map(|_| {
            let local_client = Arc::clone(&shared_client);

            thread::spawn(move || {
                for i in 0..iterations {
                    local_client.log_count("some.counter", i as i64).unwrap();
                    local_client.log_timing("some.timer", i).unwrap();
                    local_client.log_gauge("some.gauge", i).unwrap();
                    local_client.log_gauge("some.gauge", i as f64).unwrap();
                    local_client.log_set("some.set", i as i64).unwrap();
                    local_client.log_raw("some.raw", i, Some(i as i64)).unwrap();
                    local_client.count().segment("some").segment("counter").send(i);
                    thread::sleep(Duration::from_millis(1));
                }
            })
        })
        .collect();

    for t in threads {
        t.join().unwrap();
    }
}

/// How a line reached a `RecordingChannel`
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendKind {
    Blocking,
    Async,
}

/// Channel that remembers every line along with the method used to send it.
#[allow(dead_code)]
#[derive(Debug, Default, Clone)]
pub struct RecordingChannel {
    lines: Arc<Mutex<Vec<(SendKind, String)>>>,
}

#[allow(dead_code)]
impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(SendKind, String)> {
        self.lines.lock().unwrap().clone()
    }

    fn record(&self, kind: SendKind, line: &str) {
        self.lines.lock().unwrap().push((kind, line.to_string()));
    }
}

impl OutputChannel for RecordingChannel {
    fn send(&self, line: &str) {
        self.record(SendKind::Blocking, line);
    }

    fn send_async<'a>(&'a self, line: String) -> SendFuture<'a> {
        Box::pin(async move { self.record(SendKind::Async, &line) })
    }
}
