#[cfg(feature = "sdl-display")]
pub mod display;
pub mod overlay;

#[cfg(feature = "sdl-display")]
pub use display::Sdl2Display;
pub use overlay::compose;

use crate::capture::Frame;
use crate::error::DisplayError;

/// Input reported by a display sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCode {
    Char(char),
    Escape,
    /// The window was closed by the user
    Close,
}

/// On-screen consumer of composed frames.
pub trait DisplaySink {
    /// Shows `frame` in the named window, creating it on first use.
    fn present(&mut self, window: &str, frame: &Frame) -> Result<(), DisplayError>;

    fn move_window(&mut self, window: &str, x: u32, y: u32) -> Result<(), DisplayError>;

    /// Next pending key, if any. Never blocks.
    fn poll_input(&mut self) -> Option<KeyCode>;

    /// Closes every window. Called once by the owner.
    fn destroy_all(&mut self);
}

impl<T: DisplaySink + ?Sized> DisplaySink for Box<T> {
    fn present(&mut self, window: &str, frame: &Frame) -> Result<(), DisplayError> {
        (**self).present(window, frame)
    }

    fn move_window(&mut self, window: &str, x: u32, y: u32) -> Result<(), DisplayError> {
        (**self).move_window(window, x, y)
    }

    fn poll_input(&mut self) -> Option<KeyCode> {
        (**self).poll_input()
    }

    fn destroy_all(&mut self) {
        (**self).destroy_all()
    }
}
