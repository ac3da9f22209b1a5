//! Metrics macros, no-ops when the `metrics` feature is disabled.

/// Starts a response-time timer with a label set.
#[macro_export]
macro_rules! timer {
    (START, $metric:ident, $label:expr, $timer:ident) => {
        #[cfg(feature = "metrics")]
        let $timer = $crate::metrics::$metric.with_label_values($label).start_timer();
        #[cfg(not(feature = "metrics"))]
        let $timer = ();
    };
    (DISCARD, $timer:ident) => {
        #[cfg(feature = "metrics")]
        $timer.stop_and_discard();
    };
    (STOP, $timer:ident) => {
        #[cfg(feature = "metrics")]
        $timer.stop_and_record();
    };
}

/// Increments a counter with a label set.
#[macro_export]
macro_rules! inc {
    ($metric:ident, $label:expr) => {
        #[cfg(feature = "metrics")]
        $crate::metrics::$metric.with_label_values($label).inc();
    };
}
