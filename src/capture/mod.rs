pub mod decoder;
pub mod frame;
pub mod pattern;
pub mod screen;
pub mod source;
#[cfg(feature = "v4l2-capture")]
pub mod v4l2;

pub use frame::Frame;
pub use frame::PixelFormat;
pub use pattern::TestPattern;
pub use screen::ScreenGrab;
pub use source::{open_primary, probe_secondary, FrameSource, SecondarySource};
#[cfg(feature = "v4l2-capture")]
pub use v4l2::V4l2Capture;
