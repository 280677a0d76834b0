//! Text analysis shared by the field builders

pub mod category;
pub mod keywords;
pub mod names;
pub mod people;
pub mod physical;
pub mod publisher;
pub mod reading;
pub mod script;
pub mod title;
