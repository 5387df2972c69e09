/// `info!` when the caller asked for verbose output, `debug!` otherwise.
macro_rules! status {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            tracing::info!($($arg)+)
        } else {
            tracing::debug!($($arg)+)
        }
    };
}

/// `warn!` when verbose, `debug!` otherwise.
macro_rules! complain {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            tracing::warn!($($arg)+)
        } else {
            tracing::debug!($($arg)+)
        }
    };
}

pub(crate) use complain;
pub(crate) use status;
