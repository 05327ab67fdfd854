use std::sync::LazyLock;

use prometheus::{
    register_int_counter_vec_with_registry, register_int_gauge_with_registry, IntCounterVec,
    IntGauge, Registry,
};

pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

pub static OUTGOING_REQUESTS_COUNTER: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec_with_registry!(
        "relay_ip_checker_outgoing_requests",
        "Requests sent to upstream services",
        &["destination", "path"],
        &REGISTRY
    )
    .unwrap()
});

pub static RELAY_REFRESH_COUNTER: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec_with_registry!(
        "relay_ip_checker_relay_refreshes",
        "Relay list load attempts by source and outcome",
        &["source", "outcome"],
        &REGISTRY
    )
    .unwrap()
});

pub static ALLOWED_RELAYS: LazyLock<IntGauge> = LazyLock::new(|| {
    register_int_gauge_with_registry!(
        "relay_ip_checker_allowed_relays",
        "Relay addresses currently in the cache",
        &REGISTRY
    )
    .unwrap()
});

pub static CHECK_IP_RESPONSES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec_with_registry!(
        "relay_ip_checker_check_ip_responses",
        "Answers given by the check-ip routes",
        &["route", "status"],
        &REGISTRY
    )
    .unwrap()
});
