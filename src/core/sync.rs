//! Lock helpers shared by the preference stores and the scanner engine

use std::sync::LockResult;

/// Turn a poisoned lock into the caller's error type instead of panicking
///
/// Poisoning only happens when a thread panicked while holding the guard;
/// the data behind it is not trusted afterwards.
///
/// # Examples
/// ```
/// use std::sync::Mutex;
/// use totemscan::core::sync::handle_mutex_poison;
/// use totemscan::scanner::api::ScanError;
///
/// let preferred = Mutex::new("usb-0");
/// let guard = handle_mutex_poison(preferred.lock(), |message| ScanError::Internal { message })
///     .unwrap();
/// assert_eq!(*guard, "usb-0");
/// ```
pub fn handle_mutex_poison<T, E>(
    result: LockResult<T>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<T, E> {
    result.map_err(|poisoned| {
        error_constructor(format!(
            "lock poisoned by an earlier panic ({})",
            poisoned
        ))
    })
}
