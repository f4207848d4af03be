//! Value ranges and the observation/action space descriptions built from them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One end of a range.
///
/// RL-Glue allows a bound to be open (`NEGINF`/`POSINF`) or left
/// unspecified (`UNSPEC`) instead of a concrete number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Bound<T> {
    /// A concrete bound.
    Value(T),
    /// Unbounded below.
    NegInf,
    /// Unbounded above.
    PosInf,
    /// The environment did not say.
    Unspecified,
}

impl<T: Copy> Bound<T> {
    /// Returns the concrete value, if there is one.
    pub fn value(&self) -> Option<T> {
        match self {
            Bound::Value(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns `true` for `NEGINF`, `POSINF` and `UNSPEC`.
    pub fn is_special(&self) -> bool {
        !matches!(self, Bound::Value(_))
    }
}

impl<T: fmt::Display> fmt::Display for Bound<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Value(v) => write!(f, "{}", v),
            Bound::NegInf => write!(f, "NEGINF"),
            Bound::PosInf => write!(f, "POSINF"),
            Bound::Unspecified => write!(f, "UNSPEC"),
        }
    }
}

/// A closed `[min, max]` range for one dimension.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range<T> {
    pub min: Bound<T>,
    pub max: Bound<T>,
}

/// A range over a discrete (integer) dimension.
pub type IntRange = Range<i64>;
/// A range over a continuous dimension.
pub type DoubleRange = Range<f64>;

impl<T: Copy> Range<T> {
    pub fn new(min: Bound<T>, max: Bound<T>) -> Self {
        Self { min, max }
    }

    /// Returns `true` when either end is open or unspecified.
    pub fn has_special_bound(&self) -> bool {
        self.min.is_special() || self.max.is_special()
    }
}

impl Range<i64> {
    /// Shorthand for a fully specified integer range.
    pub fn ints(min: i64, max: i64) -> Self {
        Self::new(Bound::Value(min), Bound::Value(max))
    }
}

impl Range<f64> {
    /// Shorthand for a fully specified real range.
    pub fn doubles(min: f64, max: f64) -> Self {
        Self::new(Bound::Value(min), Bound::Value(max))
    }
}

impl<T: fmt::Display> fmt::Display for Range<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {})", self.min, self.max)
    }
}

/// Describes either the observation or the action space of a task.
///
/// Repeated dimensions, written `(n min max)` in the task spec, are expanded
/// into `n` separate entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpaceSpec {
    pub ints: Vec<IntRange>,
    pub doubles: Vec<DoubleRange>,
    pub char_count: usize,
}

impl SpaceSpec {
    /// Number of integer dimensions.
    pub fn discrete_dims(&self) -> usize {
        self.ints.len()
    }

    /// Number of real-valued dimensions.
    pub fn continuous_dims(&self) -> usize {
        self.doubles.len()
    }

    /// Range of the `index`-th integer dimension.
    pub fn int_range(&self, index: usize) -> Option<&IntRange> {
        self.ints.get(index)
    }

    /// Range of the `index`-th real dimension.
    pub fn double_range(&self, index: usize) -> Option<&DoubleRange> {
        self.doubles.get(index)
    }
}

impl fmt::Display for SpaceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.ints.is_empty() {
            write!(f, " INTS")?;
            for range in &self.ints {
                write!(f, " {}", range)?;
            }
        }
        if !self.doubles.is_empty() {
            write!(f, " DOUBLES")?;
            for range in &self.doubles {
                write!(f, " {}", range)?;
            }
        }
        if self.char_count > 0 {
            write!(f, " CHARCOUNT {}", self.char_count)?;
        }
        Ok(())
    }
}
