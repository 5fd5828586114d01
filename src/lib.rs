//! Layered include/exclude rule resolution for a repository's tree view and
//! captured file contents.

pub mod config;
pub mod core;
pub mod utils;

pub use crate::config::ScopeConfig;
pub use crate::core::{
    IgnorePolicy, RuleEdit, Scope, ScopeError, ScopeRequest, ScopeResult, ScopeSession,
};
