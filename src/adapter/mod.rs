pub mod classifier;
pub mod json_file;
pub mod memory;
