//! Document viewport: current page, render scale and raster canvas height.
//!
//! The rasterizer itself is an external capability behind [`Rasterizer`]. A
//! page change only commits once the rasterizer has produced the new page, so
//! the frame used for coordinate conversion always matches what is on screen.

#[cfg(test)]
#[path = "viewport_test.rs"]
mod viewport_test;

use crate::error::EditorError;
use crate::transform::RasterFrame;

/// Geometry of a freshly rasterized page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterPage {
    pub width: f64,
    pub height: f64,
    pub scale: f64,
}

/// Turns a page number into pixels on the host's canvas.
pub trait Rasterizer {
    /// Number of pages in the loaded document.
    fn page_count(&self) -> u32;

    /// Render `page` (1-indexed) and report its raster geometry.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::RenderTargetMissing`] when the canvas is gone,
    /// or any other error the backend hits.
    fn rasterize(&mut self, page: u32) -> Result<RasterPage, EditorError>;
}

/// A navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageNav {
    Next,
    Prev,
    GoTo(u32),
}

/// Current page plus the raster frame of that page.
#[derive(Debug, Clone)]
pub struct Viewport {
    page: u32,
    page_count: u32,
    frame: RasterFrame,
    width: f64,
    active: bool,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { page: 1, page_count: 1, frame: RasterFrame::default(), width: 0.0, active: true }
    }
}

impl Viewport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current page, 1-indexed.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Frame of the page currently on screen.
    #[must_use]
    pub fn frame(&self) -> RasterFrame {
        self.frame
    }

    /// Raster width of the page currently on screen.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Clamp `page` to `[1, page_count]`.
    #[must_use]
    pub fn clamp(&self, page: u32) -> u32 {
        page.clamp(1, self.page_count.max(1))
    }

    /// Page a navigation request would land on.
    #[must_use]
    pub fn target(&self, nav: PageNav) -> u32 {
        match nav {
            PageNav::Next => self.clamp(self.page.saturating_add(1)),
            PageNav::Prev => self.clamp(self.page.saturating_sub(1)),
            PageNav::GoTo(n) => self.clamp(n),
        }
    }

    /// Start over on a newly loaded document: page 1, fresh page count.
    ///
    /// # Errors
    ///
    /// Propagates rasterizer failures; the viewport is left unchanged.
    pub fn open<R: Rasterizer + ?Sized>(&mut self, rasterizer: &mut R) -> Result<u32, EditorError> {
        let count = rasterizer.page_count().max(1);
        let raster = rasterizer.rasterize(1)?;
        self.page_count = count;
        self.commit(1, raster);
        tracing::debug!(page_count = count, "document opened in viewport");
        Ok(1)
    }

    /// Navigate, re-rasterize the target page, then commit the new page and
    /// frame. Returns the page now on screen.
    ///
    /// # Errors
    ///
    /// Propagates rasterizer failures; the viewport stays on the old page.
    pub fn navigate<R: Rasterizer + ?Sized>(&mut self, rasterizer: &mut R, nav: PageNav) -> Result<u32, EditorError> {
        let target = self.target(nav);
        let raster = rasterizer.rasterize(target)?;
        self.commit(target, raster);
        tracing::debug!(page = target, scale = raster.scale, "viewport page changed");
        Ok(target)
    }

    /// Keyboard binding: arrows navigate only while this viewport is active.
    #[must_use]
    pub fn key_nav(&self, key: &str) -> Option<PageNav> {
        if !self.active {
            return None;
        }
        match key {
            "ArrowRight" => Some(PageNav::Next),
            "ArrowLeft" => Some(PageNav::Prev),
            _ => None,
        }
    }

    /// Mark whether the editor view currently owns the keyboard.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn commit(&mut self, page: u32, raster: RasterPage) {
        self.page = page;
        self.frame = RasterFrame::new(raster.scale, raster.height);
        self.width = raster.width;
    }
}
