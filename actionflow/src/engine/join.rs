//! The join barrier.
//!
//! A barrier owns one slot per join constituent. Plain values resolve their
//! slots at arming time; chain handles resolve when they complete, possibly
//! concurrently. The settle callback fires exactly once: either with every
//! slot filled, in the original input order, or with the first constituent
//! halt.

use crate::errors::ChainError;
use crate::value::Value;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

type SettleFn = Box<dyn FnOnce(Result<Vec<Value>, ChainError>) + Send>;

pub(crate) struct JoinBarrier {
    slots: Mutex<Vec<Option<Value>>>,
    pending: AtomicUsize,
    on_settled: Mutex<Option<SettleFn>>,
}

impl JoinBarrier {
    /// Creates a barrier over `width` unresolved slots.
    pub(crate) fn new<F>(width: usize, on_settled: F) -> Arc<Self>
    where
        F: FnOnce(Result<Vec<Value>, ChainError>) + Send + 'static,
    {
        Arc::new(Self {
            slots: Mutex::new((0..width).map(|_| None).collect()),
            pending: AtomicUsize::new(width),
            on_settled: Mutex::new(Some(Box::new(on_settled))),
        })
    }

    /// Fills a slot. The last fill fires the settle callback with the slots
    /// read out in input order. Filling a slot twice is ignored, never
    /// double-counted.
    pub(crate) fn resolve(&self, slot: usize, value: Value) {
        {
            let mut slots = self.slots.lock();
            match slots.get_mut(slot) {
                Some(entry @ None) => *entry = Some(value),
                Some(_) => {
                    tracing::warn!(slot, "join slot resolved twice; ignoring");
                    return;
                }
                None => {
                    tracing::warn!(slot, "join slot out of range; ignoring");
                    return;
                }
            }
        }
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            if let Some(settle) = self.on_settled.lock().take() {
                let values: Vec<Value> =
                    self.slots.lock().iter_mut().filter_map(Option::take).collect();
                settle(Ok(values));
            }
        }
    }

    /// Settles the barrier with a halt of the chain in `slot`. Only the
    /// first halt wins; anything after the barrier has settled is ignored.
    pub(crate) fn fail(&self, slot: usize, reason: ChainError) {
        if let Some(settle) = self.on_settled.lock().take() {
            settle(Err(ChainError::JoinedChainHalted {
                slot,
                reason: Arc::new(reason),
            }));
        } else {
            tracing::debug!(slot, "join already settled; ignoring late halt");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{downcast_ref, value};
    use std::sync::atomic::AtomicUsize as Count;

    fn collect_settled() -> (
        Arc<Mutex<Option<Result<Vec<Value>, ChainError>>>>,
        impl FnOnce(Result<Vec<Value>, ChainError>) + Send + 'static,
    ) {
        let out = Arc::new(Mutex::new(None));
        let sink = out.clone();
        (out, move |settled| {
            *sink.lock() = Some(settled);
        })
    }

    fn values_of(out: &Mutex<Option<Result<Vec<Value>, ChainError>>>) -> Vec<i32> {
        out.lock()
            .as_ref()
            .and_then(|r| r.as_ref().ok())
            .map(|values| {
                values
                    .iter()
                    .filter_map(|v| downcast_ref::<i32>(v).copied())
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn test_settles_in_input_order_not_resolution_order() {
        let (out, settle) = collect_settled();
        let barrier = JoinBarrier::new(3, settle);

        barrier.resolve(2, value(30_i32));
        barrier.resolve(0, value(10_i32));
        assert!(out.lock().is_none());

        barrier.resolve(1, value(20_i32));
        assert_eq!(values_of(&out), vec![10, 20, 30]);
    }

    #[test]
    fn test_double_resolution_is_ignored() {
        let (out, settle) = collect_settled();
        let barrier = JoinBarrier::new(2, settle);

        barrier.resolve(0, value(1_i32));
        barrier.resolve(0, value(99_i32));
        assert!(out.lock().is_none(), "double fill must not decrement");

        barrier.resolve(1, value(2_i32));
        assert_eq!(values_of(&out), vec![1, 2]);
    }

    #[test]
    fn test_settle_fires_exactly_once() {
        let fired = Arc::new(Count::new(0));
        let seen = fired.clone();
        let barrier = JoinBarrier::new(1, move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        barrier.resolve(0, value(1_i32));
        barrier.fail(0, ChainError::Halted { index: 0 });
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_first_halt_wins() {
        let (out, settle) = collect_settled();
        let barrier = JoinBarrier::new(2, settle);

        barrier.fail(1, ChainError::Halted { index: 3 });
        barrier.fail(0, ChainError::Halted { index: 0 });

        let settled = out.lock();
        let Some(Err(ChainError::JoinedChainHalted { slot, .. })) = settled.as_ref() else {
            panic!("expected the first halt to settle the barrier");
        };
        assert_eq!(*slot, 1);
    }

    #[test]
    fn test_resolution_after_halt_is_ignored() {
        let (out, settle) = collect_settled();
        let barrier = JoinBarrier::new(2, settle);

        barrier.resolve(0, value(1_i32));
        barrier.fail(1, ChainError::Halted { index: 0 });
        barrier.resolve(1, value(2_i32));

        assert!(matches!(&*out.lock(), Some(Err(_))));
    }
}
