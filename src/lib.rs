//! flux-stream - a push-based reactive stream library
//!
//! Values that change over time are modeled as subscriber-driven streams
//! with controlled laziness, bounded resource usage, and deterministic
//! disposal. Sources feed operators feed combinators; control (subscription,
//! teardown) flows the other way.

pub mod bridge;
pub mod cancel;
pub mod combine;
pub mod error;
pub mod flux;
pub mod message;
pub mod ops;
pub mod sources;

// Re-export the public surface at the crate root
pub use bridge::{from_stream, into_stream};
pub use cancel::CancelToken;
pub use combine::{
    combine_latest, combine_latest_named, synchronized, Completion, FinalValue, FluxInput,
    LatestOptions, SyncOptions,
};
pub use error::{BuildError, FluxError, FluxResult};
pub use flux::{Flux, Lazy, Subscription};
pub use message::{Message, Signal, SignalKind};
pub use ops::{
    average, average_annotated, debounce, drop_if, elapsed, field, filter, max, max_annotated, min,
    min_annotated, rank, single_from_array, sum, sum_annotated, tally, tally_annotated, throttle,
    timeout_value, transform, Annotated, ArrayPickOptions, Fallback, FieldOptions, MathOp,
    MathOptions, MissingField, Order, TimeoutValueOptions,
};
pub use sources::{
    from_array, from_fn, manual, manual_with, FnSourceOptions, FnStream, FromArrayOptions,
    ManualOptions,
};
