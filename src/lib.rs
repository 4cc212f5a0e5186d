#[macro_use(debug)]
extern crate tracing;

pub mod dfa;
pub mod graph;
pub mod regex;
pub mod render;
pub mod tree;
