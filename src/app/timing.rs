use crate::scene::{FrameReport, ObjectId};
use std::time::Instant;
use winit::window::Window;

pub struct FrameTiming {
    last_fps_time: Instant,
    frame_count: u32,
    render_ms: f32,
    draw_calls: usize,
    transparent: usize,
    hovered: Option<ObjectId>,
    base_title: String,
}

impl FrameTiming {
    pub fn new(base_title: String) -> Self {
        Self {
            last_fps_time: Instant::now(),
            frame_count: 0,
            render_ms: 0.0,
            draw_calls: 0,
            transparent: 0,
            hovered: None,
            base_title,
        }
    }

    pub fn record_frame(
        &mut self,
        report: &FrameReport,
        render_ms: f32,
        hovered: Option<ObjectId>,
    ) {
        self.render_ms = render_ms;
        self.draw_calls = report.draw_calls;
        self.transparent = report.transparent.len();
        self.hovered = hovered;
    }

    /// Counts a frame and, twice a second, refreshes the window title.
    pub fn update(&mut self, window: Option<&Window>, now: Instant) {
        self.frame_count = self.frame_count.saturating_add(1);
        let elapsed = now.saturating_duration_since(self.last_fps_time);
        if elapsed.as_secs_f32() >= 0.5 {
            let fps = self.frame_count as f32 / elapsed.as_secs_f32();
            if let Some(window) = window {
                window.set_title(&self.title(fps));
            }
            self.frame_count = 0;
            self.last_fps_time = now;
        }
    }

    fn title(&self, fps: f32) -> String {
        let hovered = self
            .hovered
            .map(|id| format!(", hover {}", id))
            .unwrap_or_default();
        format!(
            "{} - {:.1} fps, {} draws ({} transparent), render {:.2} ms{}",
            self.base_title, fps, self.draw_calls, self.transparent, self.render_ms, hovered
        )
    }
}
