pub mod concrete_type;
pub mod ir;
pub mod options;
pub mod sample;
pub mod scope;
pub mod symbol;
pub mod utils;

#[cfg(test)]
mod clip_distance_tests;
