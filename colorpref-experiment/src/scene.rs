//! Frame builders for every screen of the session.
//!
//! The left half of the window is seen by one eye and the right half by the
//! other. Each eye's field is a lattice box with a fixation cross; the left
//! field sits `left_shift` higher to match the subject's stereoscope.

use crate::config::{Geometry, RatingScale};
use colorpref_core::{Color, DrawItem, Frame, Shape};
use std::f32::consts::PI;

const BOX_SIZE: f32 = 0.27;
const WRAP: f32 = 0.23;
const WIDE_WRAP: f32 = 0.8;
const PROBE_SIZE: f32 = 0.018;
const MONDRIAN_SIZE: f32 = 0.08;
const MONDRIAN_SPREAD: f32 = 0.5 / 8.0;
const PRIME_MASK_SIZE: f32 = 0.25;
const GABOR_SIZE: f32 = 0.024;
const GABOR_CYCLES: f32 = 4.0;
const RING_ELEMENTS: usize = 8;
const RATING_ROW: f32 = 0.045;
const SLIDER_Y: f32 = -0.2;
const SLIDER_HALF_WIDTH: f32 = 0.3;

pub const READY: &str = "Hit space when ready.";
pub const BREAKING_HINT: &str = "Then, press space again when you see a colored dot.";
pub const ORIENTATION_HINT: &str =
    "When you see a striped pattern, press the arrow key in the direction of tilt.";
pub const CONFIRMATION: &str = "Response received!";
pub const LOCATION_QUESTION: &str = "Location?";
pub const TILT_QUESTION: &str = "Direction of tilt?";
pub const LEFT_RIGHT: &str = "Left (L)       Right (R)";
pub const VISIBILITY_QUESTION: &str = "Did you see any circles with crosses?";
pub const LOCATIONS_QUESTION: &str = "Use the up and down arrow keys to indicate where in the box \
                                      you saw the circles, then press space to submit.";
pub const COLOR_QUESTION: &str = "Which of the following colors did you see?";
pub const FAREWELL: &str = "All trials have been completed. Thank you for your participation!";
const FLICKER_INSTRUCTIONS: &str = "Press the left and right arrow keys to adjust the luminance \
                                    of the colors. When the circle does not seem to flicker \
                                    anymore, press space to continue.";
const MOTION_INSTRUCTIONS: &str = "Press the left and right arrow keys to adjust the luminance \
                                   of the colors. When the pattern's movement seems to change \
                                   direction, press space to continue.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Eye {
    Left,
    Right,
}

/// Stateless builder; every call returns a fresh frame or item list.
#[derive(Debug, Clone)]
pub struct Scene {
    geometry: Geometry,
    aspect: f32,
}

impl Scene {
    pub fn new(geometry: Geometry, aspect: f32) -> Self {
        Self {
            geometry,
            aspect: if aspect > 0.0 { aspect } else { 1.0 },
        }
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Size of a shape that is `width` wide and visually square.
    fn square(&self, width: f32) -> (f32, f32) {
        (width, width * self.aspect)
    }

    fn center(&self, eye: Eye) -> (f32, f32) {
        let g = &self.geometry;
        match eye {
            Eye::Left => (-g.center_dist, g.ypos + g.left_shift),
            Eye::Right => (g.center_dist, g.ypos),
        }
    }

    fn at(&self, eye: Eye, dx: f32, dy: f32) -> (f32, f32) {
        let (x, y) = self.center(eye);
        (x + dx, y + dy)
    }

    fn text(&self, content: &str, pos: (f32, f32)) -> DrawItem {
        DrawItem::text(content, pos, self.geometry.text_size, WRAP)
    }

    /// The same text in both eyes, `dy` above the box centers.
    fn binocular_text(&self, content: &str, dy: f32) -> [DrawItem; 2] {
        [
            self.text(content, self.at(Eye::Left, 0.0, dy)),
            self.text(content, self.at(Eye::Right, 0.0, dy)),
        ]
    }

    fn cross(&self, eye: Eye, half_width: f32, half_height: f32) -> [DrawItem; 2] {
        let (x, y) = self.center(eye);
        let line = |from: (f32, f32), to: (f32, f32)| {
            DrawItem::new(
                Shape::Line {
                    to,
                    color: Color::WHITE,
                },
                from,
            )
        };
        [
            line((x - half_width, y), (x + half_width, y)),
            line((x, y - half_height), (x, y + half_height)),
        ]
    }

    /// Fusion boxes and fixation crosses for both eyes.
    pub fn background(&self) -> Frame {
        let mut frame = Frame::default();
        for eye in [Eye::Left, Eye::Right] {
            frame.push(DrawItem::new(
                Shape::Lattice {
                    size: self.square(BOX_SIZE),
                    color: Color::WHITE,
                },
                self.center(eye),
            ));
        }
        frame.extend(self.cross(Eye::Left, 0.015, 0.0145 * self.aspect));
        frame.extend(self.cross(Eye::Right, 0.015, 0.015 * self.aspect));
        frame
    }

    pub fn ready(&self, orientation_stage: bool) -> Frame {
        let hint = if orientation_stage {
            ORIENTATION_HINT
        } else {
            BREAKING_HINT
        };
        let mut frame = self.background();
        frame.extend(self.binocular_text(READY, 0.14));
        frame.extend(self.binocular_text(hint, -0.12));
        frame
    }

    pub fn confirmation(&self) -> Frame {
        let mut frame = self.background();
        frame.extend(self.binocular_text(CONFIRMATION, 0.1));
        frame
    }

    /// Question above the fixation point and the answer choices on it.
    pub fn question(&self, question: &str, choices: &str) -> Frame {
        let mut frame = self.background();
        frame.extend(self.binocular_text(question, 0.14));
        frame.extend(self.binocular_text(choices, 0.0));
        frame
    }

    pub fn rating(&self, scale: &RatingScale, cursor: usize) -> Frame {
        let mut frame = self.background();
        let row = |i: usize| -RATING_ROW * (i as f32 + 1.0);
        for eye in [Eye::Left, Eye::Right] {
            frame.push(DrawItem::new(
                Shape::Rect {
                    size: (0.4, 0.05 * self.aspect),
                    fill: Color::BLACK,
                    outline: Some(Color::WHITE),
                },
                self.at(eye, 0.0, row(cursor)),
            ));
        }
        frame.extend(self.binocular_text(VISIBILITY_QUESTION, 0.14));
        for (i, label) in scale.labels.iter().enumerate() {
            frame.extend(self.binocular_text(label, row(i)));
        }
        frame
    }

    pub fn locations(&self, upper: bool, lower: bool) -> Frame {
        let mut frame = self.background();
        for (selected, dy) in [(upper, 0.11), (lower, -0.11)] {
            if !selected {
                continue;
            }
            for eye in [Eye::Left, Eye::Right] {
                frame.push(DrawItem::new(
                    Shape::Patch {
                        size: (0.24, 0.12 * self.aspect),
                        color: Color::TURQUOISE,
                    },
                    self.at(eye, 0.0, dy),
                ));
            }
        }
        frame.extend(self.binocular_text(LOCATIONS_QUESTION, -0.2));
        frame
    }

    pub fn color_seen(&self, first: Color, second: Color) -> Frame {
        let mut frame = self.background();
        frame.extend(self.binocular_text(COLOR_QUESTION, 0.14));
        for eye in [Eye::Left, Eye::Right] {
            for (color, dx) in [(first, -0.068), (second, 0.068)] {
                frame.push(DrawItem::new(
                    Shape::CrossDisc {
                        size: self.square(PROBE_SIZE),
                        color,
                    },
                    self.at(eye, dx, 0.0),
                ));
            }
        }
        frame.extend(self.binocular_text("(L)                 (R)", -0.06));
        frame.extend(self.binocular_text("Both (space)", -0.1));
        frame
    }

    /// Row of candidate colors with their assigned ranks; the cursor box
    /// frames the highlighted one.
    pub fn preference(&self, colors: &[Color], ranks: &[Option<u8>], cursor: usize) -> Frame {
        let n = colors.len();
        let column = |i: usize| (i as f32 - (n as f32 - 1.0) / 2.0) * 0.1;
        let mut frame = Frame::default();
        frame.push(DrawItem::new(
            Shape::Rect {
                size: (0.12, 0.225 * self.aspect),
                fill: Color::BLACK,
                outline: Some(Color::WHITE),
            },
            (column(cursor), 0.175),
        ));
        for (i, color) in colors.iter().enumerate() {
            frame.push(DrawItem::new(
                Shape::CrossDisc {
                    size: self.square(PROBE_SIZE),
                    color: *color,
                },
                (column(i), 0.2),
            ));
            let label = ranks
                .get(i)
                .copied()
                .flatten()
                .map_or_else(|| "_".to_string(), |r| r.to_string());
            frame.push(self.text(&label, (column(i), 0.12)));
        }
        frame.push(DrawItem::text(
            format!(
                "Enter your preference ranking (1 for most favorite, {n} for least favorite) \
                 for the indicated color. Press x to clear all if you make a mistake. The \
                 experiment will continue once all {n} colors have been ranked."
            ),
            (0.0, 0.4),
            self.geometry.text_size,
            WIDE_WRAP,
        ));
        frame
    }

    fn slider(&self, frame: &mut Frame, scale: f64, instructions: &str) {
        frame.push(DrawItem::new(
            Shape::Line {
                to: (SLIDER_HALF_WIDTH, SLIDER_Y),
                color: Color::GRAY,
            },
            (-SLIDER_HALF_WIDTH, SLIDER_Y),
        ));
        frame.push(DrawItem::new(
            Shape::Rect {
                size: (0.01, 0.02 * self.aspect),
                fill: Color::BLACK,
                outline: Some(Color::WHITE),
            },
            (-SLIDER_HALF_WIDTH + 2.0 * SLIDER_HALF_WIDTH * scale as f32, SLIDER_Y),
        ));
        frame.push(DrawItem::text(
            instructions,
            (0.0, 0.4),
            self.geometry.text_size,
            WIDE_WRAP,
        ));
    }

    pub fn flicker(&self, shown: Color, scale: f64) -> Frame {
        let mut frame = Frame::default();
        frame.push(DrawItem::new(
            Shape::Disc {
                size: self.square(0.18),
                fill: shown,
            },
            (0.0, 0.1),
        ));
        self.slider(&mut frame, scale, FLICKER_INSTRUCTIONS);
        frame
    }

    /// Two complementary gratings, each given as its color and phase offset
    /// in quarter periods.
    pub fn motion(&self, first: (Color, u8), second: (Color, u8), scale: f64) -> Frame {
        let mut frame = Frame::default();
        for (color, offset_quarters) in [first, second] {
            frame.push(DrawItem::new(
                Shape::Bars {
                    size: (0.6, 0.1 * self.aspect),
                    color,
                    periods: 8,
                    offset_quarters,
                },
                (0.0, 0.1),
            ));
        }
        self.slider(&mut frame, scale, MOTION_INSTRUCTIONS);
        frame
    }

    pub fn farewell(&self) -> Frame {
        Frame::default().with(DrawItem::text(
            FAREWELL,
            (0.0, 0.0),
            self.geometry.text_size,
            WIDE_WRAP,
        ))
    }

    /// The two small masks flanking the box center of the unsuppressed eye.
    pub fn mondrian_pair(&self, index: usize) -> [DrawItem; 2] {
        let size = self.square(MONDRIAN_SIZE);
        [MONDRIAN_SPREAD, -MONDRIAN_SPREAD]
            .map(|dx| DrawItem::new(Shape::Mondrian { index, size }, self.at(Eye::Right, dx, 0.0)))
    }

    /// One large mask covering the unsuppressed eye's box.
    pub fn prime_mask(&self, index: usize) -> DrawItem {
        DrawItem::new(
            Shape::Mondrian {
                index,
                size: self.square(PRIME_MASK_SIZE),
            },
            self.center(Eye::Right),
        )
    }

    pub fn probe(&self, color: Color, offset: f64) -> DrawItem {
        DrawItem::new(
            Shape::CrossDisc {
                size: self.square(PROBE_SIZE),
                color,
            },
            self.at(Eye::Left, offset as f32, 0.0),
        )
    }

    /// Ring element positions relative to the suppressed box center,
    /// starting at three-quarters of a turn and stepping an eighth.
    pub fn ring_offsets(&self) -> [(f32, f32); RING_ELEMENTS] {
        let r = self.geometry.ring_radius as f32;
        std::array::from_fn(|k| {
            let angle = (0.75 + 0.25 * k as f32) * PI;
            (r / self.aspect * angle.cos(), r * angle.sin())
        })
    }

    /// Priming ring. The element in the popout half (top or bottom of the
    /// ring) carries `primary`, the rest `secondary`.
    pub fn ring(
        &self,
        primary: Color,
        secondary: Color,
        popout_offset: f64,
        opacity: f32,
    ) -> Vec<DrawItem> {
        let popout = if popout_offset > 0.0 { 7 } else { 3 };
        self.ring_offsets()
            .iter()
            .enumerate()
            .map(|(k, &(dx, dy))| {
                let color = if k == popout { primary } else { secondary };
                DrawItem::new(
                    Shape::CrossDisc {
                        size: self.square(PROBE_SIZE),
                        color,
                    },
                    self.at(Eye::Left, dx, dy),
                )
                .with_opacity(opacity)
            })
            .collect()
    }

    pub fn gabor(&self, target_offset: f64, tilt_deg: f64) -> DrawItem {
        DrawItem::new(
            Shape::Gabor {
                size: self.square(GABOR_SIZE),
                tilt_deg: tilt_deg as f32,
                cycles: GABOR_CYCLES,
            },
            self.at(Eye::Left, 0.0, target_offset as f32),
        )
    }

    /// Black disc and cross that keep fixation visible over the prime mask.
    pub fn fixation_overlay(&self) -> Vec<DrawItem> {
        let mut items = vec![DrawItem::new(
            Shape::Disc {
                size: self.square(PROBE_SIZE),
                fill: Color::BLACK,
            },
            self.center(Eye::Right),
        )];
        items.extend(self.cross(Eye::Right, 0.015, 0.015 * self.aspect));
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene() -> Scene {
        Scene::new(Geometry::default(), 16.0 / 9.0)
    }

    #[test]
    fn background_has_two_boxes_and_crosses() {
        let frame = scene().background();
        assert_eq!(frame.count(|s| matches!(s, Shape::Lattice { .. })), 2);
        assert_eq!(frame.count(|s| matches!(s, Shape::Line { .. })), 4);
        let left = &frame.items[0];
        assert!((left.pos.0 + 0.4).abs() < 1e-6);
        assert!((left.pos.1 - 0.155).abs() < 1e-6);
    }

    #[test]
    fn ring_elements_sit_on_the_circle() {
        let s = scene();
        let offsets = s.ring_offsets();
        assert!((offsets[7].0).abs() < 1e-6);
        assert!((offsets[7].1 - 0.12).abs() < 1e-6);
        assert!((offsets[3].1 + 0.12).abs() < 1e-6);
        for (dx, dy) in offsets {
            let r = ((dx * s.aspect).powi(2) + dy.powi(2)).sqrt();
            assert!((r - 0.12).abs() < 1e-5);
        }
    }

    #[test]
    fn popout_element_takes_primary_color() {
        let red = Color::new(8, 0, 0);
        let blue = Color::new(0, 0, 36);
        let ring = scene().ring(red, blue, -0.12, 0.5);
        let reds: Vec<_> = ring
            .iter()
            .filter(|i| matches!(i.shape, Shape::CrossDisc { color, .. } if color == red))
            .collect();
        assert_eq!(reds.len(), 1);
        assert!(reds[0].pos.1 < scene().geometry().ypos);
        assert!(ring.iter().all(|i| i.opacity == 0.5));
    }

    #[test]
    fn rating_cursor_moves_down_rows() {
        let s = scene();
        let scale = RatingScale::three_level();
        let top = s.rating(&scale, 0);
        let bottom = s.rating(&scale, 2);
        let cursor_y = |f: &Frame| {
            f.items
                .iter()
                .find(|i| matches!(i.shape, Shape::Rect { .. }))
                .map(|i| i.pos.1)
                .unwrap()
        };
        assert!((cursor_y(&top) - cursor_y(&bottom) - 2.0 * RATING_ROW).abs() < 1e-6);
        assert_eq!(top.texts().filter(|t| t.contains("visible")).count(), 6);
    }

    #[test]
    fn preference_labels_show_ranks() {
        let colors = [Color::new(1, 0, 0), Color::new(0, 1, 0), Color::new(0, 0, 1)];
        let frame = scene().preference(&colors, &[Some(2), None, Some(1)], 1);
        let labels: Vec<_> = frame.texts().take(3).collect();
        assert_eq!(labels, vec!["2", "_", "1"]);
        assert!(frame.texts().last().unwrap().contains("3 for least favorite"));
    }
}
