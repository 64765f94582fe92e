use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("chatgpt_cli.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter =
    Counter::new("chatgpt_cli.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("chatgpt_cli.client.request_duration_seconds");

pub(crate) static STREAM_CHUNKS: Counter = Counter::new("chatgpt_cli.stream.chunks");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("chatgpt_cli.stream.errors");
pub(crate) static STREAM_BYTES: Counter = Counter::new("chatgpt_cli.stream.bytes");
pub(crate) static STREAM_DURATION: Moments = Moments::new("chatgpt_cli.stream.duration_seconds");

pub(crate) static SESSION_LOAD_FAILURES: Counter =
    Counter::new("chatgpt_cli.session.load_failures");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_CHUNKS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_BYTES);
    collector.register_moments(&STREAM_DURATION);

    collector.register_counter(&SESSION_LOAD_FAILURES);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_with_collector() {
        register_biometrics(Collector::new());
    }
}
