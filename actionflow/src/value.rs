//! Opaque values flowing through a chain.
//!
//! The engine is value-type-agnostic: every action receives and produces a
//! [`Value`], a reference-counted `Any`. Payloads are shared, not owned; a
//! retry re-supplies the same input and a join barrier hands one aggregate
//! to several consumers.

use std::any::Any;
use std::sync::Arc;

/// An opaque payload passed between actions.
pub type Value = Arc<dyn Any + Send + Sync>;

/// Wraps an arbitrary payload into a [`Value`].
#[must_use]
pub fn value<T: Any + Send + Sync>(inner: T) -> Value {
    Arc::new(inner)
}

/// The unit value used as the initial input of every chain.
#[must_use]
pub fn unit() -> Value {
    Arc::new(())
}

/// Borrows the payload as `T`, if that is what the value holds.
#[must_use]
pub fn downcast_ref<T: Any>(value: &Value) -> Option<&T> {
    value.downcast_ref::<T>()
}

/// Recovers the typed payload, returning the original value on mismatch.
///
/// # Errors
///
/// Returns the untouched [`Value`] if it does not hold a `T`.
pub fn downcast<T: Any + Send + Sync>(value: Value) -> Result<Arc<T>, Value> {
    value.downcast::<T>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_round_trip() {
        let v = value(42_i32);
        assert_eq!(downcast_ref::<i32>(&v), Some(&42));
    }

    #[test]
    fn test_downcast_ref_wrong_type() {
        let v = value("hello".to_string());
        assert!(downcast_ref::<i32>(&v).is_none());
    }

    #[test]
    fn test_downcast_owned() {
        let v = value(vec![1_u8, 2, 3]);
        let recovered = downcast::<Vec<u8>>(v).ok();
        assert_eq!(recovered.as_deref(), Some(&vec![1, 2, 3]));
    }

    #[test]
    fn test_downcast_owned_mismatch_returns_value() {
        let v = value(7_u64);
        let back = downcast::<String>(v).unwrap_err();
        assert_eq!(downcast_ref::<u64>(&back), Some(&7));
    }

    #[test]
    fn test_unit_is_unit() {
        assert!(downcast_ref::<()>(&unit()).is_some());
    }

    #[test]
    fn test_clones_share_payload() {
        let v = value(String::from("shared"));
        let w = v.clone();
        assert!(Arc::ptr_eq(&v, &w));
    }
}
