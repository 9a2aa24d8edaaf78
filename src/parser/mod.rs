pub mod html;
pub mod json_extractor;

pub use json_extractor::{extract_json, parse_json};
