//! Thread ownership: a lifecycle-tracked OS thread wrapper and the factory
//! that fixes the detached-vs-joinable policy.

pub mod factory;
pub mod thread;

pub use factory::ThreadFactory;
pub use thread::{Thread, ThreadLifecycle};
