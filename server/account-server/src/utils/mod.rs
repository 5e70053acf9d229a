pub mod detached;

pub use detached::run_detached;
