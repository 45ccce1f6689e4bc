use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("cyberinstruct.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter =
    Counter::new("cyberinstruct.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("cyberinstruct.client.request_duration_seconds");

pub(crate) static STREAM_EVENTS: Counter = Counter::new("cyberinstruct.stream.events");
pub(crate) static STREAM_BYTES: Counter = Counter::new("cyberinstruct.stream.bytes");
pub(crate) static STREAM_INTERRUPTIONS: Counter =
    Counter::new("cyberinstruct.stream.interruptions");

pub(crate) static SESSION_TOPIC_SWITCHES: Counter =
    Counter::new("cyberinstruct.session.topic_switches");
pub(crate) static SESSION_HANDLE_OPEN_FAILURES: Counter =
    Counter::new("cyberinstruct.session.handle_open_failures");
pub(crate) static SESSION_FALLBACKS: Counter = Counter::new("cyberinstruct.session.fallbacks");
pub(crate) static SESSION_SENDS: Counter = Counter::new("cyberinstruct.session.sends");
pub(crate) static SESSION_REJECTED: Counter = Counter::new("cyberinstruct.session.rejected");
pub(crate) static SESSION_CHUNKS: Counter = Counter::new("cyberinstruct.session.chunks");
pub(crate) static SESSION_REPLY_DURATION: Moments =
    Moments::new("cyberinstruct.session.reply_duration_seconds");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_EVENTS);
    collector.register_counter(&STREAM_BYTES);
    collector.register_counter(&STREAM_INTERRUPTIONS);

    collector.register_counter(&SESSION_TOPIC_SWITCHES);
    collector.register_counter(&SESSION_HANDLE_OPEN_FAILURES);
    collector.register_counter(&SESSION_FALLBACKS);
    collector.register_counter(&SESSION_SENDS);
    collector.register_counter(&SESSION_REJECTED);
    collector.register_counter(&SESSION_CHUNKS);
    collector.register_moments(&SESSION_REPLY_DURATION);
}
