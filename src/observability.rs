use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("novachat.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("novachat.client.request_errors");
pub(crate) static CLIENT_TRANSPORT_ERRORS: Counter =
    Counter::new("novachat.client.transport_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("novachat.client.request_duration_seconds");

pub(crate) static HEALTH_CHECKS: Counter = Counter::new("novachat.connection.health_checks");
pub(crate) static HEALTH_CHECK_FAILURES: Counter =
    Counter::new("novachat.connection.health_check_failures");
pub(crate) static CONNECTION_TRANSITIONS: Counter =
    Counter::new("novachat.connection.transitions");

pub(crate) static SESSION_SENDS: Counter = Counter::new("novachat.session.sends");
pub(crate) static SESSION_SEND_REJECTIONS: Counter =
    Counter::new("novachat.session.send_rejections");
pub(crate) static SESSION_SEND_FAILURES: Counter = Counter::new("novachat.session.send_failures");
pub(crate) static SESSION_CLEARS: Counter = Counter::new("novachat.session.clears");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_counter(&CLIENT_TRANSPORT_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&HEALTH_CHECKS);
    collector.register_counter(&HEALTH_CHECK_FAILURES);
    collector.register_counter(&CONNECTION_TRANSITIONS);

    collector.register_counter(&SESSION_SENDS);
    collector.register_counter(&SESSION_SEND_REJECTIONS);
    collector.register_counter(&SESSION_SEND_FAILURES);
    collector.register_counter(&SESSION_CLEARS);
}
