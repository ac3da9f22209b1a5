//! Metrics macros, no-ops when the `metrics` feature is disabled.
//!
//! Mirrors `op-deposit-providers-alloy`'s own `crate::inc!`/`crate::gauge!` convention.

/// Increments a counter with a label set.
#[macro_export]
macro_rules! inc {
    ($metric:ident, $label:expr) => {
        #[cfg(feature = "metrics")]
        $crate::metrics::$metric.with_label_values($label).inc();
    };
}

/// Increments a counter with a label set by an arbitrary amount.
#[macro_export]
macro_rules! inc_by {
    ($metric:ident, $label:expr, $amount:expr) => {
        #[cfg(feature = "metrics")]
        $crate::metrics::$metric.with_label_values($label).inc_by($amount);
    };
}

/// Sets a gauge's value.
#[macro_export]
macro_rules! gauge {
    ($metric:ident, $value:expr) => {
        #[cfg(feature = "metrics")]
        $crate::metrics::$metric.set($value);
    };
}
