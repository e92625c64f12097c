//! Flow event logging whose level follows the request's debug flag.

/// Emit a flow event at `info` when diagnostics are on, else at `debug`.
macro_rules! flow_event {
    ($debug:expr, $($arg:tt)+) => {
        if $debug {
            ::tracing::info!($($arg)+);
        } else {
            ::tracing::debug!($($arg)+);
        }
    };
}

pub(crate) use flow_event;
