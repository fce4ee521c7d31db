//! Test modules for the scanner system
//!
//! Engine lifecycle tests run against scripted camera and decoder doubles
//! from `helpers`.

pub mod helpers;
