//! Rolling math over numeric streams.
//!
//! Each operator keeps private running state. By default an output that is
//! absent (NaN) or identical to the previous emission is suppressed; the
//! annotated variants emit the incoming value alongside the computed one
//! instead of replacing it.

use serde::Serialize;

use crate::flux::Flux;
use crate::ops::link;

/// Which running computation an operator maintains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MathOp {
    Min,
    Max,
    Sum,
    Average,
    Tally,
}

/// Settings shared by the rolling math operators.
#[derive(Debug, Clone, Copy)]
pub struct MathOptions {
    /// Suppress emissions whose computed output is absent (NaN).
    pub skip_undefined: bool,
    /// Suppress emissions identical to the previous emitted output.
    pub skip_identical: bool,
}

impl Default for MathOptions {
    fn default() -> Self {
        Self {
            skip_undefined: true,
            skip_identical: true,
        }
    }
}

/// Output shape of the `*_annotated` variants: the incoming value plus the
/// computation that accompanied it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotated {
    pub value: f64,
    pub op: MathOp,
    pub computed: f64,
}

struct Rolling {
    op: MathOp,
    count: u64,
    sum: f64,
    extreme: Option<f64>,
}

impl Rolling {
    fn new(op: MathOp) -> Self {
        Rolling {
            op,
            count: 0,
            sum: 0.0,
            extreme: None,
        }
    }

    /// Fold in one value; NaN inputs leave the state untouched. Returns the
    /// current computed output, NaN while absent.
    fn update(&mut self, value: f64) -> f64 {
        match self.op {
            MathOp::Tally => {
                self.count += 1;
                return self.count as f64;
            }
            _ if value.is_nan() => {}
            MathOp::Min => {
                self.extreme = Some(self.extreme.map_or(value, |current| current.min(value)));
            }
            MathOp::Max => {
                self.extreme = Some(self.extreme.map_or(value, |current| current.max(value)));
            }
            MathOp::Sum | MathOp::Average => {
                self.count += 1;
                self.sum += value;
            }
        }
        match self.op {
            MathOp::Min | MathOp::Max => self.extreme.unwrap_or(f64::NAN),
            MathOp::Sum => {
                if self.count == 0 {
                    f64::NAN
                } else {
                    self.sum
                }
            }
            MathOp::Average => {
                if self.count == 0 {
                    f64::NAN
                } else {
                    self.sum / self.count as f64
                }
            }
            MathOp::Tally => self.count as f64,
        }
    }
}

/// Apply the suppression policy; returns the output to emit, if any.
fn advance(
    state: &mut Rolling,
    previous: &mut Option<f64>,
    value: f64,
    options: &MathOptions,
) -> Option<f64> {
    let computed = state.update(value);
    if computed.is_nan() && options.skip_undefined {
        return None;
    }
    if options.skip_identical {
        if let Some(previous) = *previous {
            if previous == computed {
                return None;
            }
        }
    }
    *previous = Some(computed);
    Some(computed)
}

fn rolling_value(op: MathOp, upstream: &Flux<f64>, options: MathOptions) -> Flux<f64> {
    let mut state = Rolling::new(op);
    let mut previous = None;
    link(upstream, false, move |value, out| {
        if let Some(computed) = advance(&mut state, &mut previous, *value, &options) {
            out.set(computed);
        }
    })
}

fn rolling_annotated(op: MathOp, upstream: &Flux<f64>, options: MathOptions) -> Flux<Annotated> {
    let mut state = Rolling::new(op);
    let mut previous = None;
    link(upstream, false, move |value, out| {
        if let Some(computed) = advance(&mut state, &mut previous, *value, &options) {
            out.set(Annotated {
                value: *value,
                op,
                computed,
            });
        }
    })
}

pub fn min(upstream: &Flux<f64>, options: MathOptions) -> Flux<f64> {
    rolling_value(MathOp::Min, upstream, options)
}

pub fn max(upstream: &Flux<f64>, options: MathOptions) -> Flux<f64> {
    rolling_value(MathOp::Max, upstream, options)
}

pub fn sum(upstream: &Flux<f64>, options: MathOptions) -> Flux<f64> {
    rolling_value(MathOp::Sum, upstream, options)
}

pub fn average(upstream: &Flux<f64>, options: MathOptions) -> Flux<f64> {
    rolling_value(MathOp::Average, upstream, options)
}

/// Count of values seen so far.
pub fn tally<V>(upstream: &Flux<V>, options: MathOptions) -> Flux<f64>
where
    V: Clone + Send + 'static,
{
    let mut count: u64 = 0;
    let mut previous = None;
    link(upstream, false, move |_value, out| {
        count += 1;
        let computed = count as f64;
        if options.skip_identical && previous == Some(computed) {
            return;
        }
        previous = Some(computed);
        out.set(computed);
    })
}

pub fn min_annotated(upstream: &Flux<f64>, options: MathOptions) -> Flux<Annotated> {
    rolling_annotated(MathOp::Min, upstream, options)
}

pub fn max_annotated(upstream: &Flux<f64>, options: MathOptions) -> Flux<Annotated> {
    rolling_annotated(MathOp::Max, upstream, options)
}

pub fn sum_annotated(upstream: &Flux<f64>, options: MathOptions) -> Flux<Annotated> {
    rolling_annotated(MathOp::Sum, upstream, options)
}

pub fn average_annotated(upstream: &Flux<f64>, options: MathOptions) -> Flux<Annotated> {
    rolling_annotated(MathOp::Average, upstream, options)
}

pub fn tally_annotated(upstream: &Flux<f64>, options: MathOptions) -> Flux<Annotated> {
    rolling_annotated(MathOp::Tally, upstream, options)
}

/// Emit a value whenever it outranks the reigning one according to
/// `is_higher`. `skip_identical` additionally suppresses equal values that
/// the ranking would otherwise promote.
pub fn rank<V, F>(upstream: &Flux<V>, mut is_higher: F, options: MathOptions) -> Flux<V>
where
    V: Clone + PartialEq + Send + 'static,
    F: FnMut(&V, &V) -> bool + Send + 'static,
{
    let mut champion: Option<V> = None;
    link(upstream, false, move |value, out| {
        if let Some(current) = &champion {
            if !is_higher(value, current) {
                return;
            }
            if options.skip_identical && current == value {
                return;
            }
        }
        champion = Some(value.clone());
        out.set(value.clone());
    })
}
