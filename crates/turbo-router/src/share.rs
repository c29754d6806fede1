//! Structural sharing between successive snapshots.
//!
//! Sharing `next` against `prev` returns a value equal to `next` in which
//! every part that is unchanged from `prev` is the very allocation `prev`
//! used. Consumers that compare by reference skip unchanged subtrees.

use std::sync::Arc;

use router_core::{SharedMap, SharedValue};

/// Values that can reuse the allocations of a previous version.
pub trait Share: Sized {
    /// Return `next`, reusing `prev`'s allocations wherever they are equal.
    fn share(prev: &Self, next: Self) -> Self;
}

impl Share for SharedValue {
    fn share(prev: &Self, next: Self) -> Self {
        if prev.same_ref(&next) {
            return prev.clone();
        }

        match (prev, next) {
            (SharedValue::Object(prev_map), SharedValue::Object(next_map)) => {
                let next_map = Arc::try_unwrap(next_map).unwrap_or_else(|arc| (*arc).clone());
                let mut changed = prev_map.len() != next_map.len();
                let mut out = SharedMap::new();

                for (key, value) in next_map {
                    let value = match prev_map.get(&key) {
                        Some(old) => {
                            let value = Share::share(old, value);
                            changed |= !value.same_ref(old);
                            value
                        }
                        None => {
                            changed = true;
                            value
                        }
                    };
                    out.insert(key, value);
                }

                if changed {
                    SharedValue::Object(Arc::new(out))
                } else {
                    prev.clone()
                }
            }
            (SharedValue::Array(prev_items), SharedValue::Array(next_items)) => {
                let next_items = Arc::try_unwrap(next_items).unwrap_or_else(|arc| (*arc).clone());
                let mut changed = prev_items.len() != next_items.len();
                let mut out = Vec::with_capacity(next_items.len());

                for (index, value) in next_items.into_iter().enumerate() {
                    let value = match prev_items.get(index) {
                        Some(old) => {
                            let value = Share::share(old, value);
                            changed |= !value.same_ref(old);
                            value
                        }
                        None => {
                            changed = true;
                            value
                        }
                    };
                    out.push(value);
                }

                if changed {
                    SharedValue::Array(Arc::new(out))
                } else {
                    prev.clone()
                }
            }
            // Opaque values are never diffed; an existing handle stays put
            (SharedValue::Opaque(_), SharedValue::Opaque(_)) => prev.clone(),
            (_, next @ SharedValue::Opaque(_)) => next,
            (_, next) if *prev == next => prev.clone(),
            (_, next) => next,
        }
    }
}

impl<T> Share for Arc<T>
where
    T: Share + Clone + PartialEq,
{
    fn share(prev: &Self, next: Self) -> Self {
        if Arc::ptr_eq(prev, &next) || **prev == *next {
            return Arc::clone(prev);
        }
        let next = Arc::try_unwrap(next).unwrap_or_else(|arc| (*arc).clone());
        Arc::new(T::share(prev, next))
    }
}

impl<T: Share> Share for Vec<T> {
    fn share(prev: &Self, next: Self) -> Self {
        next.into_iter()
            .enumerate()
            .map(|(index, value)| match prev.get(index) {
                Some(old) => T::share(old, value),
                None => value,
            })
            .collect()
    }
}

impl<T: Share> Share for Option<T> {
    fn share(prev: &Self, next: Self) -> Self {
        match (prev, next) {
            (Some(old), Some(value)) => Some(T::share(old, value)),
            (_, next) => next,
        }
    }
}
