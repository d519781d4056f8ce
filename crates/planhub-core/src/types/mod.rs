//! Domain types shared across the planhub client.

mod identity;
mod profile;
mod task;

pub use identity::{Identity, Session};
pub use profile::{Profile, ProfileUpdate};
pub use task::{NewTask, Task, TaskUpdate};
