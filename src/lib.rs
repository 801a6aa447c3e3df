#![deny(unsafe_op_in_unsafe_fn)]

// the data structure
pub mod rbtree;
pub mod validate;

// test harness
pub mod fuzz;
pub mod logging;

pub use rbtree::{Color, InorderWalk, InsertError, NodeRef, RBTree};
pub use validate::{Violation, check, is_valid};
