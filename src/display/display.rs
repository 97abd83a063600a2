//! SDL2 Window Display Module
//! Presents composed frames in named SDL2 windows and reports key presses.

use sdl2::event::Event;
use sdl2::pixels::PixelFormatEnum;
use sdl2::render::{Canvas, TextureCreator};
use sdl2::video::{Window, WindowContext, WindowPos};
use sdl2::EventPump;
use tracing::{debug, info};

use super::{DisplaySink, KeyCode};
use crate::capture::{Frame, PixelFormat};
use crate::error::DisplayError;

struct NamedWindow {
    title: String,
    canvas: Canvas<Window>,
    texture_creator: TextureCreator<WindowContext>,
    size: (u32, u32),
}

/// SDL2 display sink. Must stay on the thread that created it.
pub struct Sdl2Display {
    video: sdl2::VideoSubsystem,
    event_pump: EventPump,
    windows: Vec<NamedWindow>,
    _sdl: sdl2::Sdl,
}

fn backend(e: impl ToString) -> DisplayError {
    DisplayError::Backend(e.to_string())
}

impl Sdl2Display {
    pub fn new() -> Result<Self, DisplayError> {
        let sdl = sdl2::init().map_err(backend)?;
        let video = sdl.video().map_err(backend)?;
        let event_pump = sdl.event_pump().map_err(backend)?;
        info!("SDL2 video driver: {}", video.current_video_driver());

        Ok(Self {
            video,
            event_pump,
            windows: Vec::new(),
            _sdl: sdl,
        })
    }

    fn window(&mut self, title: &str, width: u32, height: u32) -> Result<&mut NamedWindow, DisplayError> {
        if let Some(i) = self.windows.iter().position(|w| w.title == title) {
            return Ok(&mut self.windows[i]);
        }

        let window = self
            .video
            .window(title, width, height)
            .position_centered()
            .resizable()
            .build()
            .map_err(backend)?;
        let canvas = window.into_canvas().accelerated().build().map_err(backend)?;
        let texture_creator = canvas.texture_creator();
        info!("Opened window {:?} at {}x{}", title, width, height);

        self.windows.push(NamedWindow {
            title: title.to_owned(),
            canvas,
            texture_creator,
            size: (width, height),
        });
        let last = self.windows.len() - 1;
        Ok(&mut self.windows[last])
    }
}

impl DisplaySink for Sdl2Display {
    fn present(&mut self, title: &str, frame: &Frame) -> Result<(), DisplayError> {
        if frame.format() != PixelFormat::Rgb24 {
            return Err(DisplayError::Upload(format!(
                "expected RGB24, got {}",
                frame.format()
            )));
        }
        let (width, height) = frame.dimensions();
        let target = self.window(title, width, height)?;

        if target.size != (width, height) {
            debug!("Resizing window {:?} to {}x{}", title, width, height);
            target
                .canvas
                .window_mut()
                .set_size(width, height)
                .map_err(backend)?;
            target.size = (width, height);
        }

        let mut texture = target
            .texture_creator
            .create_texture_streaming(PixelFormatEnum::RGB24, width, height)
            .map_err(|e| DisplayError::Upload(e.to_string()))?;
        texture
            .update(None, &frame.data, frame.meta.stride as usize)
            .map_err(|e| DisplayError::Upload(e.to_string()))?;

        target.canvas.clear();
        target.canvas.copy(&texture, None, None).map_err(backend)?;
        target.canvas.present();
        Ok(())
    }

    fn move_window(&mut self, title: &str, x: u32, y: u32) -> Result<(), DisplayError> {
        if let Some(w) = self.windows.iter_mut().find(|w| w.title == title) {
            w.canvas.window_mut().set_position(
                WindowPos::Positioned(x as i32),
                WindowPos::Positioned(y as i32),
            );
        }
        Ok(())
    }

    fn poll_input(&mut self) -> Option<KeyCode> {
        while let Some(event) = self.event_pump.poll_event() {
            match event {
                Event::Quit { .. } => return Some(KeyCode::Close),
                Event::KeyDown {
                    keycode: Some(key), ..
                } => {
                    let name = key.name();
                    if name == "Escape" {
                        return Some(KeyCode::Escape);
                    }
                    let mut chars = name.chars();
                    if let (Some(c), None) = (chars.next(), chars.next()) {
                        return Some(KeyCode::Char(c.to_ascii_lowercase()));
                    }
                }
                _ => {}
            }
        }
        None
    }

    fn destroy_all(&mut self) {
        let count = self.windows.len();
        self.windows.clear();
        info!("Closed {} window(s)", count);
    }
}
