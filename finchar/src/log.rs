//! Logging macros used throughout the crate.
//!
//! Test builds print straight to stdout so messages show up beside failing
//! assertions. Other builds forward to the `log` facade.

#[cfg(test)]
#[allow(unused_imports)]
pub(crate) use std::{
    println as trace, println as debug, println as info, println as warn, println as error,
};

#[cfg(not(test))]
#[allow(unused_imports)]
pub(crate) use log::{debug, error, info, trace, warn};

/// Results that can report a one-line summary of themselves.
pub trait Log {
    fn summary(&self) -> String;

    /// Logs [`Log::summary`] at info level.
    fn log(&self) {
        info!("{}", self.summary());
    }
}
