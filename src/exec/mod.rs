// src/exec/mod.rs

//! Process execution layer.
//!
//! Manifest jobs build by running a shell command. [`shell`] turns a
//! [`JobConfig`](crate::config::JobConfig) into a build callback for
//! [`Job`](crate::job::Job).

pub mod shell;

pub use shell::ShellCommand;
