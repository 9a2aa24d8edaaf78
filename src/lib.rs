pub mod autopilot;
pub mod cms;
pub mod config;
pub mod content;
pub mod llm;
pub mod parser;
pub mod storage;
pub mod utils;
