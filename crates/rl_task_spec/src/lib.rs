//! # RL Task Spec
//!
//! Parser for the RL-Glue 3.0 task specification string that an environment
//! hands to an agent at initialization.
//!
//! ```text
//! VERSION RL-Glue-3.0 PROBLEMTYPE episodic DISCOUNTFACTOR 0.9
//! OBSERVATIONS INTS (0 19) ACTIONS INTS (0 3) REWARDS (-1.0 1.0) EXTRA ...
//! ```
//!
//! ## Example
//!
//! ```
//! use rl_task_spec::TaskSpec;
//!
//! let spec = TaskSpec::parse(
//!     "VERSION RL-Glue-3.0 PROBLEMTYPE episodic DISCOUNTFACTOR 0.9 \
//!      OBSERVATIONS INTS (0 19) ACTIONS INTS (0 3) REWARDS (-1 1)",
//! )
//! .unwrap();
//!
//! assert_eq!(spec.discount_factor(), 0.9);
//! assert_eq!(spec.observations().discrete_dims(), 1);
//! assert_eq!(spec.actions().int_range(0).unwrap().max.value(), Some(3));
//! ```

pub mod error;
pub mod range;
pub mod spec;

pub use error::{Result, TaskSpecError};
pub use range::{Bound, DoubleRange, IntRange, Range, SpaceSpec};
pub use spec::{TaskSpec, MAX_DIMENSIONS};
