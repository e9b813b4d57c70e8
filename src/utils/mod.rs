pub mod config;
pub mod task;

pub use config::{Config, ConnectionSettings};
pub use task::{load_tasks, parse_tasks, Task};
