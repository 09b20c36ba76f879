//! Backend bridge: command queue consumed by the worker thread.

pub mod commands;
pub mod runtime;
