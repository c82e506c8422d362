//! Source adapters: where values enter the stream graph.

pub mod array;
pub mod function;
pub mod manual;

pub use array::{from_array, FromArrayOptions};
pub use function::{from_fn, FnSourceOptions, FnStream};
pub use manual::{manual, manual_with, ManualOptions};
