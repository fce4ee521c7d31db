//! Identity numbers and scanned-payload extraction
//!
//! Chilean RUN/RUT numbers carry a modulo-11 check character. Scanned card
//! payloads (PDF417 on older cards, QR on newer ones) are noisy and mix the
//! number with names, dates and other digits; this module recovers the one
//! number whose checksum holds, plus best-effort printed fields. The guard
//! station variant scans ticket QR codes instead, handled by `ticket`.

pub mod api;
pub mod checksum;
pub mod error;
pub mod extractor;
pub mod fields;
pub mod ticket;
pub mod types;
