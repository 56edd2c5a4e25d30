//! Reusable neural building blocks.

pub mod conv;
