//! Frame loop: antialiasing modes, hook lists, presentation host and the scheduler.

/// Pre- and post-render hook lists.
pub mod hooks;
/// Presentation host and frame clocks.
pub mod host;
/// Antialiasing modes and their strategies.
pub mod mode;
/// The frame scheduler.
pub mod scheduler;
