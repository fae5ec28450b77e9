pub mod api;
pub mod config;
pub mod op_stack;
pub mod retrieve;
