//! Serde model of the JSON animation document.

pub mod model;
