//! Numeric Mutation Module
//!
//! Increment and decrement of stored numbers. Integers wrap around at their
//! width, they never saturate. The stored variant is never changed.

use chrono::Utc;

use crate::cache::{Cache, Value};
use crate::error::{CacheError, Result};

mod private {
    pub trait Sealed {}
}

// == Numeric ==
/// A number type with a matching `Value` variant.
pub trait Numeric: Copy + private::Sealed {
    /// Name reported in type mismatch errors, same as `Value::type_name`.
    const TYPE_NAME: &'static str;

    fn from_value(value: &Value) -> Option<Self>;
    fn into_value(self) -> Value;
    fn step_up(self, delta: Self) -> Self;
    fn step_down(self, delta: Self) -> Self;
}

macro_rules! impl_numeric {
    (wrapping: $($ty:ident => $variant:ident),* $(,)?) => {
        $(impl_numeric!(@impl $ty, $variant, wrapping_add, wrapping_sub);)*
    };
    (float: $($ty:ident => $variant:ident),* $(,)?) => {
        $(impl_numeric!(@impl $ty, $variant, add, sub);)*
    };
    (@impl $ty:ident, $variant:ident, $up:ident, $down:ident) => {
        impl private::Sealed for $ty {}

        impl Numeric for $ty {
            const TYPE_NAME: &'static str = stringify!($ty);

            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => Some(*v),
                    _ => None,
                }
            }

            fn into_value(self) -> Value {
                Value::$variant(self)
            }

            fn step_up(self, delta: Self) -> Self {
                #[allow(unused_imports)]
                use std::ops::Add;
                self.$up(delta)
            }

            fn step_down(self, delta: Self) -> Self {
                #[allow(unused_imports)]
                use std::ops::Sub;
                self.$down(delta)
            }
        }
    };
}

impl_numeric!(wrapping:
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    isize => Isize,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    usize => Usize,
);

impl_numeric!(float:
    f32 => F32,
    f64 => F64,
);

#[derive(Debug, Clone, Copy)]
enum Direction {
    Up,
    Down,
}

impl Direction {
    fn apply<T: Numeric>(self, current: T, delta: T) -> T {
        match self {
            Direction::Up => current.step_up(delta),
            Direction::Down => current.step_down(delta),
        }
    }

    /// Applies an `i64` delta to any numeric variant, truncating the delta to
    /// the stored width first. Returns false for non-numeric values.
    fn apply_any(self, value: &mut Value, delta: i64) -> bool {
        match value {
            Value::I8(v) => *v = self.apply(*v, delta as i8),
            Value::I16(v) => *v = self.apply(*v, delta as i16),
            Value::I32(v) => *v = self.apply(*v, delta as i32),
            Value::I64(v) => *v = self.apply(*v, delta),
            Value::Isize(v) => *v = self.apply(*v, delta as isize),
            Value::U8(v) => *v = self.apply(*v, delta as u8),
            Value::U16(v) => *v = self.apply(*v, delta as u16),
            Value::U32(v) => *v = self.apply(*v, delta as u32),
            Value::U64(v) => *v = self.apply(*v, delta as u64),
            Value::Usize(v) => *v = self.apply(*v, delta as usize),
            Value::F32(v) => *v = self.apply(*v, delta as f32),
            Value::F64(v) => *v = self.apply(*v, delta as f64),
            Value::Bool(_) | Value::Text(_) | Value::Bytes(_) | Value::Json(_) => return false,
        }
        true
    }

    fn apply_float(self, value: &mut Value, delta: f64) -> bool {
        match value {
            Value::F32(v) => *v = self.apply(*v, delta as f32),
            Value::F64(v) => *v = self.apply(*v, delta),
            _ => return false,
        }
        true
    }
}

fn mismatch(key: &str, expected: &'static str, found: &Value) -> CacheError {
    CacheError::TypeMismatch {
        key: key.to_string(),
        expected,
        found: found.type_name(),
    }
}

impl Cache {
    /// Runs `f` on the live value for `key` under the write lock.
    fn mutate_value<R>(&self, key: &str, f: impl FnOnce(&mut Value) -> Result<R>) -> Result<R> {
        let now = Utc::now();
        let mut store = self.write_store();
        let entry = store
            .live_mut(key, now)
            .ok_or_else(|| CacheError::NotFound(key.to_string()))?;
        f(&mut entry.value)
    }

    fn step_any(&self, key: &str, delta: i64, direction: Direction) -> Result<()> {
        self.mutate_value(key, |value| {
            if direction.apply_any(value, delta) {
                Ok(())
            } else {
                Err(mismatch(key, "number", value))
            }
        })
    }

    fn step_float(&self, key: &str, delta: f64, direction: Direction) -> Result<()> {
        self.mutate_value(key, |value| {
            if direction.apply_float(value, delta) {
                Ok(())
            } else {
                Err(mismatch(key, "f32 or f64", value))
            }
        })
    }

    fn step_typed<T: Numeric>(&self, key: &str, delta: T, direction: Direction) -> Result<T> {
        self.mutate_value(key, |value| {
            let current = T::from_value(value).ok_or_else(|| mismatch(key, T::TYPE_NAME, value))?;
            let next = direction.apply(current, delta);
            *value = next.into_value();
            Ok(next)
        })
    }

    // == Generic ==
    /// Adds `delta` to a stored number of any width.
    ///
    /// The delta is truncated to the stored width; integers wrap on overflow.
    pub fn increment(&self, key: &str, delta: i64) -> Result<()> {
        self.step_any(key, delta, Direction::Up)
    }

    /// Subtracts `delta` from a stored number of any width.
    pub fn decrement(&self, key: &str, delta: i64) -> Result<()> {
        self.step_any(key, delta, Direction::Down)
    }

    /// Adds `delta` to a stored `f32` or `f64`.
    pub fn increment_float(&self, key: &str, delta: f64) -> Result<()> {
        self.step_float(key, delta, Direction::Up)
    }

    /// Subtracts `delta` from a stored `f32` or `f64`.
    pub fn decrement_float(&self, key: &str, delta: f64) -> Result<()> {
        self.step_float(key, delta, Direction::Down)
    }

    // == Typed ==
    /// Adds `delta` to a value stored as exactly `T` and returns the new value.
    pub fn increment_typed<T: Numeric>(&self, key: &str, delta: T) -> Result<T> {
        self.step_typed(key, delta, Direction::Up)
    }

    /// Subtracts `delta` from a value stored as exactly `T` and returns the new value.
    pub fn decrement_typed<T: Numeric>(&self, key: &str, delta: T) -> Result<T> {
        self.step_typed(key, delta, Direction::Down)
    }
}

macro_rules! typed_ops {
    ($($ty:ident: $inc:ident, $dec:ident;)*) => {
        impl Cache {
            $(
                #[doc = concat!("Increments a value stored as `", stringify!($ty), "`.")]
                pub fn $inc(&self, key: &str, delta: $ty) -> Result<$ty> {
                    self.increment_typed(key, delta)
                }

                #[doc = concat!("Decrements a value stored as `", stringify!($ty), "`.")]
                pub fn $dec(&self, key: &str, delta: $ty) -> Result<$ty> {
                    self.decrement_typed(key, delta)
                }
            )*
        }
    };
}

typed_ops! {
    i8: increment_i8, decrement_i8;
    i16: increment_i16, decrement_i16;
    i32: increment_i32, decrement_i32;
    i64: increment_i64, decrement_i64;
    isize: increment_isize, decrement_isize;
    u8: increment_u8, decrement_u8;
    u16: increment_u16, decrement_u16;
    u32: increment_u32, decrement_u32;
    u64: increment_u64, decrement_u64;
    usize: increment_usize, decrement_usize;
    f32: increment_f32, decrement_f32;
    f64: increment_f64, decrement_f64;
}
