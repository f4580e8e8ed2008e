// src/exec/mod.rs

//! Script execution.
//!
//! - [`backend`] defines the `ActionRunner` trait the dispatcher calls and
//!   the production `ProcessLauncher`.
//! - [`launcher`] launches one script process and classifies failures.

pub mod backend;
pub mod launcher;

pub use backend::{ActionRequest, ActionRunner, ProcessLauncher};
pub use launcher::{ActionLaunchError, launch_process, spawn_process, wait_process};
