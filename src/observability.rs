use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("g9chat.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("g9chat.client.request_errors");
pub(crate) static CLIENT_CONNECT_DURATION: Moments =
    Moments::new("g9chat.client.connect_duration_seconds");

pub(crate) static STREAM_EVENTS: Counter = Counter::new("g9chat.stream.events");
pub(crate) static STREAM_BYTES: Counter = Counter::new("g9chat.stream.bytes");
pub(crate) static STREAM_FRAGMENTS: Counter = Counter::new("g9chat.stream.fragments");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("g9chat.stream.errors");
pub(crate) static STREAM_CANCELLED: Counter = Counter::new("g9chat.stream.cancelled");
pub(crate) static STREAM_DURATION: Moments = Moments::new("g9chat.stream.duration_seconds");

pub(crate) static SESSIONS_PERSISTED: Counter = Counter::new("g9chat.store.persisted");
pub(crate) static SESSIONS_LOADED: Counter = Counter::new("g9chat.store.loaded");
pub(crate) static STORE_ERRORS: Counter = Counter::new("g9chat.store.errors");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_CONNECT_DURATION);

    collector.register_counter(&STREAM_EVENTS);
    collector.register_counter(&STREAM_BYTES);
    collector.register_counter(&STREAM_FRAGMENTS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_CANCELLED);
    collector.register_moments(&STREAM_DURATION);

    collector.register_counter(&SESSIONS_PERSISTED);
    collector.register_counter(&SESSIONS_LOADED);
    collector.register_counter(&STORE_ERRORS);
}
