use crate::keys::map_key;
use anyhow::{Result, anyhow};
use colorpref_core::Key;
use pixels::{Pixels, SurfaceTexture};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, error, warn};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::ActiveEventLoop,
    keyboard::PhysicalKey,
    window::{Fullscreen, Window, WindowId},
};

/// Window, surface and the key events collected between pumps.
pub struct Host {
    fullscreen: bool,
    pub window: Option<Arc<Window>>,
    pub pixels: Option<Pixels<'static>>,
    pub size: PhysicalSize<u32>,
    pub scale_factor: f64,
    pub refresh_rate: Option<f64>,
    pub keys: VecDeque<Key>,
    /// Set by a resize; the rig resizes the surface and renderer on its next pump.
    pub resized: Option<PhysicalSize<u32>>,
    pub error: Option<anyhow::Error>,
}

impl Host {
    pub fn new(fullscreen: bool) -> Self {
        Self {
            fullscreen,
            window: None,
            pixels: None,
            size: PhysicalSize::new(0, 0),
            scale_factor: 1.0,
            refresh_rate: None,
            keys: VecDeque::new(),
            resized: None,
            error: None,
        }
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next())
            .ok_or_else(|| anyhow!("no monitor available"))?;

        self.refresh_rate = monitor
            .refresh_rate_millihertz()
            .map(|rate| rate as f64 / 1000.0);

        let mut attributes = Window::default_attributes()
            .with_title("colorpref")
            .with_resizable(false);
        if self.fullscreen {
            attributes = attributes.with_fullscreen(Some(Fullscreen::Borderless(Some(monitor))));
        }

        let window = Arc::new(event_loop.create_window(attributes)?);
        let size = window.inner_size();
        self.size = size;
        self.scale_factor = window.scale_factor();

        let surface = SurfaceTexture::new(size.width, size.height, Arc::clone(&window));
        self.pixels = Some(Pixels::new(size.width, size.height, surface)?);

        window.set_cursor_visible(false);
        window.request_redraw();
        self.window = Some(window);
        Ok(())
    }

    fn release(&mut self) {
        if let Some(window) = &self.window {
            window.set_cursor_visible(true);
        }
    }
}

impl ApplicationHandler for Host {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.create_window_and_surface(event_loop) {
                error!(error = %e, "failed to create window and surface");
                self.error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            // closing the window aborts like the escape key
            WindowEvent::CloseRequested => {
                self.release();
                self.keys.push_back(Key::Escape);
            }
            WindowEvent::KeyboardInput { event, .. } if event.state.is_pressed() => {
                if event.repeat {
                    return;
                }
                if let PhysicalKey::Code(code) = event.physical_key {
                    match map_key(code) {
                        Some(key) => self.keys.push_back(key),
                        None => debug!(?code, "ignoring key"),
                    }
                }
            }
            WindowEvent::Resized(size) => {
                self.size = size;
                self.resized = Some(size);
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                self.scale_factor = scale_factor;
            }
            // re-present the last frame, e.g. after the window was exposed
            WindowEvent::RedrawRequested => {
                if let Some(pixels) = &self.pixels {
                    if let Err(e) = pixels.render() {
                        warn!(error = %e, "failed to redraw surface");
                    }
                }
            }
            _ => {}
        }
    }
}

impl Drop for Host {
    fn drop(&mut self) {
        self.release();
        debug!("display released");
    }
}
