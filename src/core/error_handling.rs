//! Generic error handling utilities
//!
//! Lets the CLI report any module error the same way while keeping each
//! module's error type specific to its domain.

/// Trait for errors that can distinguish between user-actionable and system errors
///
/// User-actionable errors (a mistyped RUT, a missing config file, a camera
/// permission prompt that was dismissed) carry a message the operator can act
/// on. System errors (I/O, poisoned locks, backend transport failures) are
/// reported with generic context and their details go to the debug log.
///
/// # Implementation Consistency
/// When `is_user_actionable()` returns `true`, `user_message()` should return
/// `Some(message)`. When it returns `false`, `user_message()` should return `None`.
pub trait ContextualError: std::error::Error {
    /// Returns true if this error carries a message that should be shown directly
    fn is_user_actionable(&self) -> bool;

    /// Returns the operator-facing message for user-actionable errors
    fn user_message(&self) -> Option<String>;
}

/// Log errors with appropriate detail level based on error specificity
///
/// # Examples
/// ```rust,no_run
/// # use totemscan::core::error_handling::log_error_with_context;
/// # use totemscan::identity::api::{parse, IdentityError};
/// if let Err(err) = parse("12.345.678-0") {
///     // Logs: "FATAL: check character '0' does not match expected '5'"
///     log_error_with_context(&err, "Identity validation");
/// }
/// ```
pub fn log_error_with_context<E: ContextualError + std::fmt::Display + std::fmt::Debug>(
    error: &E,
    operation_context: &str,
) {
    match error.user_message() {
        Some(user_msg) if error.is_user_actionable() => log::error!("FATAL: {}", user_msg),
        _ => log::error!("FATAL: {}", operation_context),
    }
    log::debug!("DETAIL: {}", error);
    log::debug!("DEBUG_DETAILS: {:?}", error);
}
