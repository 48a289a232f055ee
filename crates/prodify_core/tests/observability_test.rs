use prodify_core::{init_observability, shutdown_observability};

#[test]
#[cfg(not(feature = "metrics"))]
fn test_init_observability_without_metrics() {
    let result = init_observability("prodify_test", 60);
    assert!(
        result.is_ok(),
        "Observability initialization should succeed without metrics feature: {:?}",
        result.err()
    );

    assert!(shutdown_observability().is_ok());
}

#[test]
#[cfg(feature = "metrics")]
fn test_recorded_metrics_flush_on_shutdown() {
    let result = init_observability("prodify_test", 60);
    assert!(
        result.is_ok(),
        "Observability initialization should succeed with metrics feature: {:?}",
        result.err()
    );

    let counter = opentelemetry::global::meter("prodify_test")
        .u64_counter("test.flushed")
        .build();
    counter.add(1, &[]);

    let flushed = shutdown_observability();
    assert!(flushed.is_ok(), "Flush should succeed: {:?}", flushed.err());

    // The provider was taken by the first shutdown.
    assert!(shutdown_observability().is_ok());
}
