//! Transformation operators over a single upstream.
//!
//! Every operator subscribes to its upstream on its own first subscriber,
//! forwards warnings, and turns the upstream's completion into its own
//! disposal. Whether its disposal also disposes the upstream is decided by
//! an explicit owns-upstream flag, never inferred.

pub mod field;
pub mod filter;
pub mod math;
pub mod pick;
pub mod rate;
pub mod timeout_value;
pub mod transform;

pub use field::{field, FieldOptions, MissingField};
pub use filter::{drop_if, filter};
pub use math::{
    average, average_annotated, max, max_annotated, min, min_annotated, rank, sum, sum_annotated,
    tally, tally_annotated, Annotated, MathOp, MathOptions,
};
pub use pick::{single_from_array, ArrayPickOptions, Order};
pub use rate::{debounce, elapsed, throttle};
pub use timeout_value::{timeout_value, Fallback, TimeoutValueOptions};
pub use transform::transform;

use crate::flux::{Flux, FluxOptions, Lazy};
use crate::message::Message;

/// The shared operator spine: wire `out` to `upstream`, handing each value
/// to `on_value` for zero-or-more emissions on `out`.
pub(crate) fn link<I, O, F>(upstream: &Flux<I>, owns_upstream: bool, on_value: F) -> Flux<O>
where
    I: Clone + Send + 'static,
    O: Clone + Send + 'static,
    F: FnMut(&I, &Flux<O>) + Send + 'static,
{
    let out: Flux<O> = Flux::with_options(FluxOptions {
        lazy: Lazy::Initial,
        keep_last: true,
    });

    let out_hook = out.clone();
    let mut pending = Some((upstream.clone(), on_value));
    out.set_on_activate(move || {
        let Some((upstream, mut on_value)) = pending.take() else {
            return;
        };
        let out = out_hook.clone();
        let subscription = upstream.subscribe(move |message| match message {
            Message::Value(value) => on_value(value, &out),
            Message::Signal(signal) if signal.is_done() => {
                out.dispose(
                    signal
                        .context
                        .clone()
                        .unwrap_or_else(|| "Upstream completed".to_string()),
                );
            }
            Message::Signal(signal) => out.signal(signal.clone()),
        });
        out_hook.add_teardown(move || {
            subscription.unsubscribe();
            if owns_upstream {
                upstream.dispose("Downstream disposed");
            }
        });
    });

    out
}
