//! I/O operations for reading and writing image stacks

mod native;

pub use native::{read_stack, write_stack, StackOptions, StackSample};

// Buffer-based I/O (no filesystem dependency)
pub use native::{read_stack_from_buffer, write_stack_to_buffer};
