//! Structured logging helpers.
//!
//! Every log line that refers to a workflow run, a trigger, or an
//! integration installation should carry its ID as a structured field
//! rather than interpolated into the message string, so logs stay
//! greppable regardless of formatting.

/// Log an event tagged with a `component` field.
#[macro_export]
macro_rules! log_event {
    (info, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::info!(component = $component, $($($field)*,)? $msg)
    };
    (warn, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::warn!(component = $component, $($($field)*,)? $msg)
    };
    (error, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::error!(component = $component, $($($field)*,)? $msg)
    };
    (debug, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::debug!(component = $component, $($($field)*,)? $msg)
    };
}

/// Log an event tagged with a workflow run ID.
#[macro_export]
macro_rules! log_run_event {
    ($level:ident, $msg:expr, $run_id:expr $(, $($field:tt)*)?) => {
        tracing::$level!(run_id = %$run_id, $($($field)*,)? $msg)
    };
}

/// Log an event tagged with an integration installation ID.
#[macro_export]
macro_rules! log_installation_event {
    ($level:ident, $msg:expr, $installation_id:expr $(, $($field:tt)*)?) => {
        tracing::$level!(installation_id = %$installation_id, $($($field)*,)? $msg)
    };
}
