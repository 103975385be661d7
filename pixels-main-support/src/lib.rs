#![deny(clippy::all)]
#![forbid(unsafe_code)]

use error_iter::ErrorIter as _;
use log::{debug, error, info};
use pixels::wgpu::Color;
use pixels::{Pixels, PixelsBuilder, SurfaceTexture};
use std::sync::Arc;
use terrarium::{Surface, Terrarium, WorldSize};
use thiserror::Error;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Cursor, CursorIcon, Fullscreen, Window, WindowId};

const BACKGROUND_COLOR: Color = Color {
    r: 0.827,
    g: 0.827,
    b: 0.827,
    a: 1.0,
};
const BACKGROUND_RGBA: [u8; 4] = [0xd3, 0xd3, 0xd3, 0xff];
const SUMMARY_INTERVAL_FRAMES: u64 = 600;

#[derive(Debug, Error)]
pub enum AnimateError {
    #[error("event loop failed")]
    EventLoop(#[from] EventLoopError),
    #[error("window creation failed")]
    Window(#[from] OsError),
    #[error("pixel surface creation failed")]
    Pixels(#[from] pixels::Error),
}

pub fn window_size_to_world_size(
    window_size: PhysicalSize<u32>,
    cell_pixel_width: u32,
) -> WorldSize {
    WorldSize::new(
        (window_size.width / cell_pixel_width).max(1),
        (window_size.height / cell_pixel_width).max(1),
    )
}

/// Runs the terrarium in a window until it is closed. Every redraw renders
/// one frame, and every frame requests the next redraw.
pub fn animate<F>(build_world: F) -> Result<(), AnimateError>
where
    F: Fn(PhysicalSize<u32>) -> Terrarium<PixelsSurface>,
{
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);
    let mut handler = AppEventHandler::new(build_world);
    event_loop.run_app(&mut handler)?;
    match handler.error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Paints squares into a `pixels` frame buffer sized to the world.
pub struct PixelsSurface {
    pixels: Pixels<'static>,
    size: WorldSize,
}

impl PixelsSurface {
    pub fn new(pixels: Pixels<'static>, size: WorldSize) -> Self {
        Self { pixels, size }
    }

    pub fn present(&self) -> Result<(), pixels::Error> {
        self.pixels.render()
    }

    pub fn resize(&mut self, window_size: PhysicalSize<u32>) -> Result<(), pixels::TextureError> {
        self.pixels
            .resize_surface(window_size.width, window_size.height)
    }
}

impl Surface for PixelsSurface {
    fn clear(&mut self, width: u32, height: u32) {
        debug_assert_eq!(WorldSize::new(width, height), self.size);
        clear_frame(self.pixels.frame_mut());
    }

    fn fill_square(&mut self, x: i32, y: i32, half_size: f32, color: [u8; 3]) {
        let size = self.size;
        fill_frame_square(self.pixels.frame_mut(), size, x, y, half_size, color);
    }
}

fn clear_frame(frame: &mut [u8]) {
    for pixel in frame.chunks_exact_mut(4) {
        pixel.copy_from_slice(&BACKGROUND_RGBA);
    }
}

/// Squares are at least one pixel and are clipped to the frame.
fn fill_frame_square(
    frame: &mut [u8],
    size: WorldSize,
    x: i32,
    y: i32,
    half_size: f32,
    color: [u8; 3],
) {
    let side = (half_size.ceil() as i32).max(1);
    let left = x - side / 2;
    let top = y - side / 2;
    let rgba = [color[0], color[1], color[2], 0xff];

    for row in top.max(0)..(top + side).min(size.height as i32) {
        for col in left.max(0)..(left + side).min(size.width as i32) {
            let index = 4 * (row as usize * size.width as usize + col as usize);
            frame[index..index + 4].copy_from_slice(&rgba);
        }
    }
}

struct App {
    world: Terrarium<PixelsSurface>,
    window: Arc<Window>,
    frames: u64,
}

impl App {
    fn new<F>(event_loop: &ActiveEventLoop, build_world: &F) -> Result<Self, AnimateError>
    where
        F: Fn(PhysicalSize<u32>) -> Terrarium<PixelsSurface>,
    {
        let window = Arc::new(Self::build_window(event_loop)?);
        let mut world = build_world(window.inner_size());
        let pixels = Self::build_pixels(&window, world.size())?;
        world.bind_surface(PixelsSurface::new(pixels, world.size()));
        info!(
            "terrarium {}x{} bound to a {}x{} window",
            world.size().width,
            world.size().height,
            window.inner_size().width,
            window.inner_size().height
        );
        Ok(Self {
            world,
            window,
            frames: 0,
        })
    }

    fn build_window(event_loop: &ActiveEventLoop) -> Result<Window, OsError> {
        let window_attributes = Window::default_attributes()
            .with_title("Terrarium")
            .with_cursor(Cursor::Icon(CursorIcon::Crosshair))
            .with_fullscreen(Some(Fullscreen::Borderless(None)))
            .with_visible(false);
        event_loop.create_window(window_attributes)
    }

    fn build_pixels(
        window: &Arc<Window>,
        size: WorldSize,
    ) -> Result<Pixels<'static>, pixels::Error> {
        let window_size = window.inner_size();
        let surface_texture =
            SurfaceTexture::new(window_size.width, window_size.height, window.clone());
        PixelsBuilder::new(size.width, size.height, surface_texture)
            .clear_color(BACKGROUND_COLOR)
            .build()
    }

    fn on_create(&mut self) {
        self.window.request_redraw();
        self.window.set_visible(true);
    }

    fn on_redraw(&mut self) -> Result<(), pixels::Error> {
        let summary = self.world.render_frame();
        self.frames += 1;
        if self.frames % SUMMARY_INTERVAL_FRAMES == 0 {
            debug!("frame {}: {:?}", self.frames, summary);
        }

        if let Some(surface) = self.world.surface() {
            surface.present()?;
        }
        self.window.request_redraw();
        Ok(())
    }

    fn on_resize(&mut self, window_size: PhysicalSize<u32>) {
        if let Some(surface) = self.world.surface_mut()
            && let Err(err) = surface.resize(window_size)
        {
            log_error("pixels.resize_surface", err);
        }
    }
}

struct AppEventHandler<F>
where
    F: Fn(PhysicalSize<u32>) -> Terrarium<PixelsSurface>,
{
    build_world: F,
    app: Option<App>,
    error: Option<AnimateError>,
}

impl<F> AppEventHandler<F>
where
    F: Fn(PhysicalSize<u32>) -> Terrarium<PixelsSurface>,
{
    fn new(build_world: F) -> Self {
        Self {
            build_world,
            app: None,
            error: None,
        }
    }
}

impl<F> ApplicationHandler for AppEventHandler<F>
where
    F: Fn(PhysicalSize<u32>) -> Terrarium<PixelsSurface>,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.app.is_some() {
            return;
        }
        match App::new(event_loop, &self.build_world) {
            Ok(mut app) => {
                app.on_create();
                self.app = Some(app);
            }
            Err(err) => {
                self.error = Some(err);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(app) = self.app.as_mut() else {
            return;
        };
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Released,
                        repeat: false,
                        ..
                    },
                ..
            } => match code {
                KeyCode::Escape | KeyCode::KeyQ | KeyCode::KeyX => {
                    event_loop.exit();
                }
                _ => (),
            },
            WindowEvent::Resized(window_size) => {
                app.on_resize(window_size);
            }
            WindowEvent::RedrawRequested => {
                if let Err(err) = app.on_redraw() {
                    log_error("pixels.render", err);
                    event_loop.exit();
                }
            }
            _ => (),
        }
    }
}

fn log_error<E: std::error::Error + 'static>(method_name: &str, err: E) {
    error!("{method_name}() failed: {err}");
    for source in err.sources().skip(1) {
        error!("  Caused by: {source}");
    }
}
