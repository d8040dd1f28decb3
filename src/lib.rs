// Tsubame image transform engine library

pub mod backend;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod transform;
