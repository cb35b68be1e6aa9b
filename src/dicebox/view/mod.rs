//! View Module
//!
//! [`ViewController`] drives the select/active state machine and pushes
//! a fresh [`Frame`] to a [`Presenter`] after every state change.

mod controller;
mod frame;

pub use controller::*;
pub use frame::*;

/// One-off messages shown next to the frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Status(String),
    Error(String),
}

/// Anything that can show frames.
pub trait Presenter {
    fn render(&mut self, frame: &Frame);

    fn notify(&mut self, notice: &Notice);
}
