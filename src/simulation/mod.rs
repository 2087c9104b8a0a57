//! Perturbation Step Function
//!
//! One random-walk step over every live entity of a store:
//! `new = clamp(old + sample * max_delta, min, max)` with `sample` in `[-1, 1]`.
//!
//! Entities whose category is not live keep their values untouched. Static
//! metrics (`max_delta == 0`) draw no sample, so adding a setpoint metric to a
//! domain does not shift the random stream of the others.

mod random;

pub use random::{RandomSource, ScriptedRandom, SeededRandom};

use chrono::{DateTime, Utc};
use tracing::trace;

use crate::store::MetricStore;
use crate::types::Category;

/// Advance every live entity by one step. Returns how many entities moved.
pub fn step(
    store: &mut MetricStore,
    live: &[Category],
    rng: &mut dyn RandomSource,
    now: DateTime<Utc>,
) -> usize {
    let (definitions, entities) = store.parts_mut();
    let mut stepped = 0;

    for entity in entities.iter_mut().filter(|e| live.contains(&e.category)) {
        for (name, def) in definitions {
            if def.is_static() {
                continue;
            }
            let Some(value) = entity.metrics.get_mut(name) else {
                continue;
            };
            let sample = rng.next_signed();
            *value = def.clamp(*value + sample * def.max_delta);
        }
        entity.last_updated = now;
        stepped += 1;
    }

    trace!(stepped, "Perturbation step applied");
    stepped
}
