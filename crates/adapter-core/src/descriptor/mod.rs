//! Adapter descriptor cards: schema types and the parser that validates them.

mod parser;
mod types;

pub use parser::{parse_descriptor, parse_descriptor_str};
pub use types::{AdapterType, ArchitectureConfig, Contact, Descriptor, FileEntry};
