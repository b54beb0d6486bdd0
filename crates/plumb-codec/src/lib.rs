//! Positional-encoding codec for SVG text nodes.
//!
//! Two grammars are recognized, both anywhere inside an attribute value:
//!
//! - `translate(x y)` (whitespace or comma separated)
//! - `matrix(a, b, c, d, x, y)` (commas optional)
//!
//! Built on `nom`. Decoding keeps a reference to the source text so that
//! re-encoding only rewrites the x field.
//!
//! # Example
//!
//! ```
//! use plumb_codec::{decode, encode};
//!
//! let decoded = decode("matrix(1, 0, 0, 1, 100, 40)").unwrap();
//! assert_eq!(decoded.x(), 100.0);
//! assert_eq!(encode(&decoded, 90.0), "matrix(1, 0, 0, 1, 90, 40)");
//! ```

mod lexer;
mod transform;

pub use transform::{decode, decode_as, encode, format_number, Decoded, Transform};
