//! Concrete model implementations behind the window-transform interface.

pub mod f0;
pub mod generator;
pub mod vc;
