//! hitmon-capture
//!
//! Turns a growing access log into hit events: [`tail`] follows the file and
//! emits appended lines, [`parser`] classifies each line.

pub mod parser;
pub mod tail;

pub use parser::{parse_line, run_parser, RawHit};
pub use tail::follow;
