//! Warning sink plumbing shared by the applier and the compressor.
//!
//! Per spec §7, the core never writes to stdout itself. Lenient-mode
//! diagnostics (anchor mismatches, structural truncation, dictionary
//! misses) are routed through a [`WarningSink`] instead; the default sink
//! forwards to the `log` crate, the conventional choice for a library that
//! doesn't want to own a global subscriber.

use std::fmt;

/// Receives human-readable warning messages produced during patch
/// application or compression.
pub trait WarningSink {
    fn warn(&self, message: &str);
}

/// Default sink: forwards to `log::warn!`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl WarningSink for LogSink {
    fn warn(&self, message: &str) {
        log::warn!("{message}");
    }
}

/// Sink that drops every message. Useful for tests that don't care about
/// diagnostics, or for callers who have deliberately opted out of them.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl WarningSink for NullSink {
    fn warn(&self, _message: &str) {}
}

/// Sink backed by a boxed closure, for callers supplying `onWarning`
/// programmatically (§6).
pub struct CallbackSink<F: Fn(&str)>(pub F);

impl<F: Fn(&str)> WarningSink for CallbackSink<F> {
    fn warn(&self, message: &str) {
        (self.0)(message);
    }
}

impl<F: Fn(&str)> fmt::Debug for CallbackSink<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackSink").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn callback_sink_forwards_messages() {
        let seen = RefCell::new(Vec::new());
        let sink = CallbackSink(|m: &str| seen.borrow_mut().push(m.to_string()));
        sink.warn("anchor mismatch at line 3");
        assert_eq!(seen.borrow().as_slice(), ["anchor mismatch at line 3"]);
    }

    #[test]
    fn null_sink_is_silent() {
        NullSink.warn("ignored");
    }
}
