//! Seams to the display and input collaborators.
//!
//! Both calls that can block (`present` until the next refresh, `wait` until a
//! key) and the non-blocking `poll` must report the abort key as
//! [`ExperimentError::Aborted`](crate::ExperimentError::Aborted).

use crate::error::Result;
use colorpref_core::{Frame, Key};

pub trait Screen {
    /// Window width over height.
    fn aspect_ratio(&self) -> f32;

    /// Shows `frame` and returns once it is on screen.
    fn present(&mut self, frame: &Frame) -> Result<()>;
}

pub trait Keyboard {
    /// Returns one pending key from `allowed`, if any, without blocking.
    fn poll(&mut self, allowed: &[Key]) -> Result<Option<Key>>;

    /// Blocks until a key from `allowed` arrives; other keys are discarded.
    fn wait(&mut self, allowed: &[Key]) -> Result<Key>;

    /// Drops every pending key event.
    fn clear(&mut self);
}
