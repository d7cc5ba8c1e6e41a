use crate::bridge::{FrameReply, KeyPress, UserEvent};
use ab_glyph::FontVec;
use anyhow::{Context, Result, anyhow};
use posner_core::{Drawable, Key, Layout};
use posner_render::SkiaRenderer;
use posner_timing::{HighPrecisionTimer, Timer};
use pixels::{Pixels, SurfaceTexture};
use std::sync::Arc;
use std::sync::mpsc::Sender;
use tracing::{debug, error, info, warn};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::ActiveEventLoop,
    keyboard::{Key as LogicalKey, NamedKey},
    window::{Fullscreen, Window, WindowId},
};

/// Window thread side of the session: shows the frames the engine sends and
/// forwards key presses stamped on the shared clock.
pub struct App {
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    renderer: Option<SkiaRenderer>,
    font: Option<FontVec>,
    layout: Layout,
    windowed: bool,

    /// Session clock; also collects commit durations.
    timer: HighPrecisionTimer,
    /// Renderer stage timings.
    render_timer: HighPrecisionTimer,
    keys: Sender<KeyPress>,

    current: Vec<Drawable>,
    pending: Option<(Vec<Drawable>, Sender<FrameReply>)>,
    aborted: bool,
}

impl App {
    pub fn new(
        layout: Layout,
        font: Option<FontVec>,
        windowed: bool,
        timer: HighPrecisionTimer,
        keys: Sender<KeyPress>,
    ) -> Self {
        Self {
            window: None,
            pixels: None,
            renderer: None,
            font,
            layout,
            windowed,
            render_timer: timer.fork(),
            timer,
            keys,
            current: Vec::new(),
            pending: None,
            aborted: false,
        }
    }

    /// Whether the operator closed the window before the session finished.
    pub fn aborted(&self) -> bool {
        self.aborted
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let (width, height) = self.layout.display;
        let mut attributes = Window::default_attributes()
            .with_title("Posner")
            .with_resizable(false);
        if self.windowed {
            attributes = attributes.with_inner_size(PhysicalSize::new(width, height));
        } else {
            let monitor = event_loop
                .primary_monitor()
                .or_else(|| event_loop.available_monitors().next())
                .ok_or_else(|| anyhow!("no monitor available"))?;
            if let Some(rate) = monitor.refresh_rate_millihertz() {
                info!(refresh_hz = rate as f64 / 1000.0, "display");
            }
            attributes = attributes.with_fullscreen(Some(Fullscreen::Borderless(Some(monitor))));
        }

        let window = Arc::new(event_loop.create_window(attributes)?);
        let size = window.inner_size();
        info!(
            width = size.width,
            height = size.height,
            scale = window.scale_factor(),
            "window created"
        );

        let surface_texture = SurfaceTexture::new(size.width, size.height, window.clone());
        self.pixels = Some(
            Pixels::new(size.width, size.height, surface_texture)
                .context("creating pixel surface")?,
        );
        self.renderer = Some(SkiaRenderer::new(
            size.width,
            size.height,
            self.layout.clone(),
            self.font.take(),
        )?);

        window.set_cursor_visible(false);
        self.window = Some(window);
        Ok(())
    }

    /// Draws the current frame and returns when it has been handed to the
    /// display, with that moment on the session clock.
    fn present(&mut self) -> Result<u64> {
        let (Some(pixels), Some(renderer)) = (self.pixels.as_mut(), self.renderer.as_mut()) else {
            return Err(anyhow!("window is not open"));
        };
        let start = self.timer.now();
        let stats = renderer.render_frame(&self.current, pixels.frame_mut(), &mut self.render_timer)?;
        pixels.render().context("presenting frame")?;
        let committed = self.timer.now();
        self.timer.record_frame(self.timer.elapsed(start));
        debug!(
            drawn = stats.drawn,
            clear_ms = stats.clear.as_secs_f64() * 1e3,
            draw_ms = stats.draw.as_secs_f64() * 1e3,
            copy_ms = stats.copy.as_secs_f64() * 1e3,
            commit_ms = (committed - start) as f64 / 1e6,
            "frame committed"
        );
        Ok(committed)
    }

    fn show(&mut self, drawables: Vec<Drawable>, reply: Sender<FrameReply>) {
        if self.pixels.is_none() {
            self.pending = Some((drawables, reply));
            return;
        }
        self.current = drawables;
        let result = self.present().map_err(|e| format!("{e:#}"));
        if let Err(msg) = &result {
            error!(error = %msg, "frame not shown");
        }
        // The engine may already be gone after an abort.
        let _ = reply.send(result);
    }

    fn abort(&mut self, event_loop: &ActiveEventLoop) {
        warn!("session aborted by the operator");
        self.aborted = true;
        self.close(event_loop);
    }

    fn close(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.set_cursor_visible(true);
        }
        event_loop.exit();
    }

    fn handle_resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        if let Some(pixels) = &mut self.pixels {
            if let Err(e) = pixels.resize_surface(size.width, size.height) {
                error!(error = %e, "failed to resize surface");
            }
            if let Err(e) = pixels.resize_buffer(size.width, size.height) {
                error!(error = %e, "failed to resize buffer");
            }
        }
        if let Some(renderer) = &mut self.renderer {
            if let Err(e) = renderer.resize(size.width, size.height) {
                error!(error = %e, "failed to resize canvas");
            }
        }
        debug!(width = size.width, height = size.height, "display resized");
    }

    /// Logs commit and render-stage timing gathered over the session.
    pub fn log_frame_stats(&self) {
        let commit = self.timer.calibration_stats();
        info!(
            mean_ms = commit.average_frame_time_ns / 1e6,
            jitter_ms = commit.jitter_ns / 1e6,
            max_ms = commit.max_frame_time_ns / 1e6,
            "frame commit timing"
        );
        if let Some(renderer) = &self.renderer {
            for (stage, stats) in renderer.component_stats() {
                info!(
                    stage,
                    mean_ms = stats.average_frame_time_ns / 1e6,
                    max_ms = stats.max_frame_time_ns / 1e6,
                    "render stage timing"
                );
            }
        }
    }
}

/// Engine-side name for a key, matching the names used in response mappings.
pub fn key_name(key: &LogicalKey) -> Option<Key> {
    match key {
        LogicalKey::Character(c) => Some(Key::new(c.as_str())),
        LogicalKey::Named(named) => Some(Key::new(match named {
            NamedKey::Space => "space",
            NamedKey::Enter => "return",
            NamedKey::Escape => "escape",
            NamedKey::Tab => "tab",
            NamedKey::Backspace => "backspace",
            NamedKey::ArrowLeft => "arrowleft",
            NamedKey::ArrowRight => "arrowright",
            NamedKey::ArrowUp => "arrowup",
            NamedKey::ArrowDown => "arrowdown",
            // Still ends an any-key wait; not usable as a response key.
            _ => "other",
        })),
        _ => None,
    }
}

impl ApplicationHandler<UserEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.create_window_and_surface(event_loop) {
            error!(error = %format!("{e:#}"), "failed to create window and surface");
            event_loop.exit();
            return;
        }
        if let Some((drawables, reply)) = self.pending.take() {
            self.show(drawables, reply);
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: UserEvent) {
        match event {
            UserEvent::Frame { drawables, reply } => self.show(drawables, reply),
            UserEvent::Finished => self.close(event_loop),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.abort(event_loop),
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.present() {
                    error!(error = %format!("{e:#}"), "redraw failed");
                }
            }
            WindowEvent::KeyboardInput { event, .. } if event.state.is_pressed() && !event.repeat => {
                let at = self.timer.now();
                if event.logical_key == LogicalKey::Named(NamedKey::Escape) {
                    self.abort(event_loop);
                    return;
                }
                if let Some(key) = key_name(&event.logical_key) {
                    debug!(key = %key, at, "key pressed");
                    // Nobody listens once the engine has stopped.
                    let _ = self.keys.send(KeyPress { key, at });
                }
            }
            WindowEvent::Resized(size) => {
                self.handle_resize(size);
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn characters_map_to_lowercase_names() {
        assert_eq!(
            key_name(&LogicalKey::Character("N".into())),
            Some(Key::new("n"))
        );
        assert_eq!(
            key_name(&LogicalKey::Named(NamedKey::Space)),
            Some(Key::new("space"))
        );
        assert_eq!(
            key_name(&LogicalKey::Named(NamedKey::ArrowLeft)),
            Some(Key::new("arrowleft"))
        );
    }

    #[test]
    fn named_keys_use_the_documented_names() {
        let cases = [
            (NamedKey::Enter, "return"),
            (NamedKey::Tab, "tab"),
            (NamedKey::Backspace, "backspace"),
            (NamedKey::ArrowRight, "arrowright"),
            (NamedKey::ArrowUp, "arrowup"),
            (NamedKey::ArrowDown, "arrowdown"),
            (NamedKey::F1, "other"),
        ];
        for (named, name) in cases {
            assert_eq!(key_name(&LogicalKey::Named(named)), Some(Key::new(name)));
        }
    }
}
