//! Identity API
//!
//! Public entry points for checksum operations and payload extraction.

pub use crate::identity::checksum::{
    clean, compute_check_digit, format, has_format, parse, validate,
};
pub use crate::identity::error::IdentityError;
pub use crate::identity::extractor::{
    normalize, Candidate, ExtractedIdentity, ExtractionPolicy, IdentityExtractor, PatternFamily,
};
pub use crate::identity::fields::{extract_fields, ScannedFields};
pub use crate::identity::ticket::extract_ticket_id;
pub use crate::identity::types::IdentityNumber;
