//! Scanner Error Types

use std::fmt;

/// Scanner error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// Camera access was refused by the operator or the platform
    PermissionDenied { message: String },
    /// No video input available
    NoDevice,
    /// The device exists but another process holds it
    DeviceBusy { device_id: String },
    /// Any other failure opening or reading the camera
    Acquisition { message: String },
    /// The stream stopped delivering frames (camera unplugged, input closed)
    StreamEnded { device_id: String },
    /// A frame could not be decoded for a reason other than "no code found"
    Decode { message: String },
    /// A track constraint (torch) could not be applied
    Constraint { message: String },
    /// Device preference storage failed
    Store { message: String },
    /// Internal failure (poisoned lock, crashed worker)
    Internal { message: String },
    /// `stop()` ran while the camera was still being opened
    Cancelled,
}

impl ScanError {
    /// Camera-level failures halt scanning; decode errors do not
    pub fn is_camera_failure(&self) -> bool {
        matches!(
            self,
            ScanError::PermissionDenied { .. }
                | ScanError::NoDevice
                | ScanError::DeviceBusy { .. }
                | ScanError::Acquisition { .. }
                | ScanError::StreamEnded { .. }
        )
    }
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::PermissionDenied { message } => {
                write!(f, "Camera permission denied: {}", message)
            }
            ScanError::NoDevice => write!(f, "No camera device available"),
            ScanError::DeviceBusy { device_id } => {
                write!(f, "Camera '{}' is in use by another application", device_id)
            }
            ScanError::Acquisition { message } => write!(f, "Camera error: {}", message),
            ScanError::StreamEnded { device_id } => {
                write!(f, "Camera stream '{}' ended unexpectedly", device_id)
            }
            ScanError::Decode { message } => write!(f, "Decode error: {}", message),
            ScanError::Constraint { message } => write!(f, "Constraint error: {}", message),
            ScanError::Store { message } => write!(f, "Preference store error: {}", message),
            ScanError::Internal { message } => write!(f, "Internal scanner error: {}", message),
            ScanError::Cancelled => write!(f, "Camera start cancelled by stop"),
        }
    }
}

impl std::error::Error for ScanError {}

impl crate::core::error_handling::ContextualError for ScanError {
    fn is_user_actionable(&self) -> bool {
        match self {
            ScanError::PermissionDenied { .. } => true, // Operator can grant access
            ScanError::NoDevice => true,                // Operator can plug a camera in
            ScanError::DeviceBusy { .. } => true,       // Operator can close the other app
            _ => false,
        }
    }

    fn user_message(&self) -> Option<String> {
        if self.is_user_actionable() {
            Some(self.to_string())
        } else {
            None
        }
    }
}

impl From<crate::scanner::decoder::DecodeError> for ScanError {
    fn from(err: crate::scanner::decoder::DecodeError) -> Self {
        ScanError::Decode {
            message: err.to_string(),
        }
    }
}

impl From<crate::store::error::StoreError> for ScanError {
    fn from(err: crate::store::error::StoreError) -> Self {
        ScanError::Store {
            message: err.to_string(),
        }
    }
}

pub type ScannerResult<T> = Result<T, ScanError>;
