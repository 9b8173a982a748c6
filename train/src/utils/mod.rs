mod checkpoint;
mod lr_scheduler;
mod plot;

pub use checkpoint::*;
pub use lr_scheduler::*;
pub use plot::*;
