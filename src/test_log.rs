//! Log capture for tests.
//!
//! Records are kept per thread, so tests running concurrently only see their own
//! messages. Everything is also forwarded to simplelog's `TestLogger`.

use std::cell::RefCell;
use std::sync::OnceLock;

use log::{Level, LevelFilter, Log, Metadata, Record};
use simplelog::{Config, TestLogger};

thread_local! {
    static RECORDS: RefCell<Vec<(Level, String)>> = const { RefCell::new(Vec::new()) };
}

struct CaptureLogger {
    inner: Box<TestLogger>,
}

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        RECORDS.with(|records| {
            records
                .borrow_mut()
                .push((record.level(), record.args().to_string()))
        });
        self.inner.log(record);
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

static LOGGER: OnceLock<CaptureLogger> = OnceLock::new();

/// Install the capturing logger once per test binary.
pub(crate) fn init() {
    let mut installed = false;
    let logger = LOGGER.get_or_init(|| {
        installed = true;
        CaptureLogger {
            inner: TestLogger::new(LevelFilter::Info, Config::default()),
        }
    });
    if installed && log::set_logger(logger).is_ok() {
        log::set_max_level(LevelFilter::Debug);
    }
}

/// Run `f` and return its output with the messages it logged at `level` on this thread.
pub(crate) fn capture<T>(level: Level, f: impl FnOnce() -> T) -> (T, Vec<String>) {
    init();
    RECORDS.with(|records| records.borrow_mut().clear());
    let out = f();
    let messages = RECORDS.with(|records| {
        records
            .borrow_mut()
            .drain(..)
            .filter(|(l, _)| *l == level)
            .map(|(_, message)| message)
            .collect()
    });
    (out, messages)
}
