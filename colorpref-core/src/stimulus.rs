//! Per-frame draw descriptors.
//!
//! A [`Frame`] is assembled from scratch for every refresh and handed to the
//! renderer; nothing about a stimulus outlives the frame it was drawn in.
//! Positions are normalized window coordinates (`-1.0..=1.0` on both axes, y
//! up). Sizes are `(width, height)` in the same units, so a visually square
//! shape carries `height = width * aspect`.

use crate::color::Color;

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Rect {
        size: (f32, f32),
        fill: Color,
        outline: Option<Color>,
    },
    Disc {
        size: (f32, f32),
        fill: Color,
    },
    /// Disc with a transparent cross cut through its center.
    CrossDisc {
        size: (f32, f32),
        color: Color,
    },
    /// Dashed square frame used as a binocular fusion lock.
    Lattice {
        size: (f32, f32),
        color: Color,
    },
    /// One image of the masking bank.
    Mondrian {
        index: usize,
        size: (f32, f32),
    },
    /// Gaussian-windowed sine grating tilted clockwise from vertical.
    Gabor {
        size: (f32, f32),
        tilt_deg: f32,
        cycles: f32,
    },
    /// Square-wave bars covering half of each period, starting
    /// `offset_quarters` quarter periods into it.
    Bars {
        size: (f32, f32),
        color: Color,
        periods: u8,
        offset_quarters: u8,
    },
    /// Gaussian blob used to highlight a selected region.
    Patch {
        size: (f32, f32),
        color: Color,
    },
    Line {
        to: (f32, f32),
        color: Color,
    },
    Text {
        content: String,
        height: f32,
        wrap: f32,
        color: Color,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawItem {
    pub shape: Shape,
    pub pos: (f32, f32),
    pub opacity: f32,
}

impl DrawItem {
    pub fn new(shape: Shape, pos: (f32, f32)) -> Self {
        Self {
            shape,
            pos,
            opacity: 1.0,
        }
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    pub fn text(content: impl Into<String>, pos: (f32, f32), height: f32, wrap: f32) -> Self {
        Self::new(
            Shape::Text {
                content: content.into(),
                height,
                wrap,
                color: Color::WHITE,
            },
            pos,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub background: Color,
    pub items: Vec<DrawItem>,
}

impl Default for Frame {
    fn default() -> Self {
        Self::new(Color::BLACK)
    }
}

impl Frame {
    pub fn new(background: Color) -> Self {
        Self {
            background,
            items: Vec::with_capacity(16),
        }
    }

    pub fn push(&mut self, item: DrawItem) -> &mut Self {
        if item.opacity > 0.0 {
            self.items.push(item);
        }
        self
    }

    pub fn with(mut self, item: DrawItem) -> Self {
        self.push(item);
        self
    }

    pub fn extend(&mut self, items: impl IntoIterator<Item = DrawItem>) -> &mut Self {
        for item in items {
            self.push(item);
        }
        self
    }

    /// Text of every text item, in draw order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.items.iter().filter_map(|i| match &i.shape {
            Shape::Text { content, .. } => Some(content.as_str()),
            _ => None,
        })
    }

    pub fn count(&self, pred: impl Fn(&Shape) -> bool) -> usize {
        self.items.iter().filter(|i| pred(&i.shape)).count()
    }
}
