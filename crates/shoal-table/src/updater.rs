use std::ops::AddAssign;

use shoal_types::Element;

/// Pluggable policy combining existing shard storage with an incoming delta.
///
/// `storage` and `delta` always have the same length (the server validates
/// the request before calling). The combine runs in place and is not atomic;
/// the server's `&mut` receiver makes callers serialize around it.
pub trait Updater<E: Element>: Send + Sync {
    fn update(&self, storage: &mut [E], delta: &[E]);
}

/// Plain elementwise accumulation: `storage[i] += delta[i]`.
#[derive(Clone, Copy, Debug, Default)]
pub struct AddUpdater;

impl<E: Element + AddAssign> Updater<E> for AddUpdater {
    fn update(&self, storage: &mut [E], delta: &[E]) {
        debug_assert_eq!(storage.len(), delta.len());
        for (slot, d) in storage.iter_mut().zip(delta) {
            *slot += *d;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_updater_accumulates() {
        let mut storage = vec![1.0f32, 2.0, 3.0];
        AddUpdater.update(&mut storage, &[0.5, -2.0, 10.0]);
        assert_eq!(storage, vec![1.5, 0.0, 13.0]);
    }

    #[test]
    fn add_updater_integer_elements() {
        let mut storage = vec![1i64, -5];
        AddUpdater.update(&mut storage, &[2, 5]);
        assert_eq!(storage, vec![3, 0]);
    }
}
