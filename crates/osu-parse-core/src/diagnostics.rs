//! Panic reporting for the public entry points

use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

use crate::error::{Error, Result};

static INIT: Once = Once::new();

/// Install a panic hook that reports faults through `tracing`.
///
/// Safe to call any number of times; only the first call installs the hook.
pub fn init_diagnostics() {
    INIT.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let location = info
                .location()
                .map(|l| format!("{}:{}", l.file(), l.line()))
                .unwrap_or_else(|| "unknown".to_string());
            tracing::error!(location = %location, "Internal fault: {}", panic_message(info.payload()));
            previous(info);
        }));
    });
}

/// Whether [`init_diagnostics`] has run
pub fn diagnostics_installed() -> bool {
    INIT.is_completed()
}

/// Run `f`, turning a panic into [`Error::Internal`].
pub(crate) fn guarded<T>(operation: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(Error::Internal(format!(
            "{} panicked: {}",
            operation,
            panic_message(payload.as_ref())
        ))),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
