//! Test modules for the scan flow
//!
//! Flow tests drive the real actor with the scanner's scripted camera and
//! decoder plus a scripted validation backend from `helpers`.

pub mod helpers;
