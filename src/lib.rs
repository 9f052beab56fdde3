//! # lineproto-stream
//!
//! Streaming parser for InfluxDB Line Protocol that handles inputs of any size
//! without holding them in memory.
//!
//! ## Why?
//!
//! Reading a whole Line Protocol dump before parsing it does not scale:
//!
//! ```ignore
//! // This will OOM on a multi-gigabyte export!
//! let text = std::fs::read_to_string("export.lp")?;
//! ```
//!
//! `lineproto-stream` pulls one character at a time and yields one point per line:
//!
//! ```ignore
//! let file = std::fs::File::open("export.lp")?;
//! for point in LineProtocolParser::from_reader(file) {
//!     process(point?);
//! }
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use lineproto_stream::{FieldValue, LineProtocolParser};
//!
//! let input = concat!(
//!     "#sensors\n",
//!     "weather,location=us-midwest temperature=82 1465839830100400200\n",
//!     "weather,location=us-east temperature=75i,raining=t\n",
//! );
//!
//! let points: Vec<_> = LineProtocolParser::from_text(input)
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//!
//! assert_eq!(points.len(), 2);
//! assert_eq!(points[0].field("temperature"), Some(&FieldValue::from(82.0)));
//! assert_eq!(points[1].get_integer("temperature"), Some(75));
//! assert_eq!(points[1].get_bool("raining"), Some(true));
//! ```
//!
//! ## Features
//!
//! - **Memory efficient**: Single pass, one character of lookahead
//! - **Error isolation**: A malformed line is skipped without disturbing the
//!   rest of the input, or aborts the parse in fail-fast mode
//! - **All field types**: String, float, integer and boolean values
//! - **Async friendly**: [`stream::parse_stream`] adapts any Tokio reader

pub mod config;
pub mod error;
pub mod parser;
pub mod source;
pub mod stream;
pub mod types;
pub mod value;

// Re-export main types at crate root
pub use config::{ErrorMode, ParserConfig};
pub use error::{Error, Result};
pub use parser::LineProtocolParser;
pub use source::{CharSource, ReaderSource, StrSource};
pub use types::{Point, PointBuilder};
pub use value::FieldValue;
