use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("consoleai.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("consoleai.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("consoleai.client.request_duration_seconds");

pub(crate) static STREAM_FRAGMENTS: Counter = Counter::new("consoleai.stream.fragments");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("consoleai.stream.errors");
pub(crate) static STREAM_BYTES: Counter = Counter::new("consoleai.stream.bytes");
pub(crate) static STREAM_TTFB: Moments = Moments::new("consoleai.stream.ttfb_seconds");

pub(crate) static SESSION_TURNS: Counter = Counter::new("consoleai.session.turns");
pub(crate) static SESSION_TURN_FAILURES: Counter = Counter::new("consoleai.session.turn_failures");
pub(crate) static SESSION_INTERRUPTS: Counter = Counter::new("consoleai.session.interrupts");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_FRAGMENTS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_BYTES);
    collector.register_moments(&STREAM_TTFB);

    collector.register_counter(&SESSION_TURNS);
    collector.register_counter(&SESSION_TURN_FAILURES);
    collector.register_counter(&SESSION_INTERRUPTS);
}
