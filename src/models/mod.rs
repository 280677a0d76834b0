//! Data models

pub mod aladin;
pub mod nlk;
pub mod publisher;
pub mod record;

pub use aladin::{AladinItem, AladinPage};
pub use nlk::SeojiRecord;
pub use publisher::{Imprint, Publisher, PublisherLocation, Region};
pub use record::{BatchResponse, ConversionOutcome, ConversionResult, ConvertItem, ConvertRequest};
