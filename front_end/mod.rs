//! Lexing, parsing, validation, and type resolution for the packet language.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod type_map;

pub use parser::{parse, ParseError};
pub use type_map::TypeMap;
