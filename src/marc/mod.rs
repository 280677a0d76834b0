//! KORMARC records in MRK form
//!
//! `record` holds the field model and its MRK rendering, `fixed` the 008
//! control field and `builders` one constructor per variable field.

pub mod builders;
pub mod fixed;
pub mod record;

pub use fixed::Fixed008;
pub use record::{DataField, Field, MarcRecord, Subfield};
