//! Factorial trial layouts and their shuffled presentation order.

use colorpref_core::{BreakingLayout, Color, OrientationLayout, Popout};
use rand::Rng;
use rand::seq::SliceRandom;

/// Indices into a layout list, each repeated the same number of times and
/// shuffled once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialOrder {
    indices: Vec<usize>,
}

impl TrialOrder {
    pub fn shuffled<R: Rng + ?Sized>(layouts: usize, repetitions: usize, rng: &mut R) -> Self {
        let mut indices: Vec<usize> = (0..layouts)
            .flat_map(|i| std::iter::repeat_n(i, repetitions))
            .collect();
        indices.shuffle(rng);
        Self { indices }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices.iter().copied()
    }

    /// Layouts in presentation order.
    pub fn select<'a, T>(&'a self, layouts: &'a [T]) -> impl Iterator<Item = &'a T> + 'a {
        self.indices.iter().filter_map(|&i| layouts.get(i))
    }
}

/// Every color at every probe offset.
pub fn breaking_layouts(colors: &[Color], offsets: &[f64]) -> Vec<BreakingLayout> {
    colors
        .iter()
        .flat_map(|&color| {
            offsets
                .iter()
                .map(move |&offset| BreakingLayout { color, offset })
        })
        .collect()
}

/// Popout color × popout half × target half × tilt sign.
pub fn orientation_layouts(ring_radius: f64, tilt: f64) -> Vec<OrientationLayout> {
    let halves = [-ring_radius, ring_radius];
    let mut layouts = Vec::with_capacity(16);
    for popout in [Popout::First, Popout::Second] {
        for popout_offset in halves {
            for target_offset in halves {
                for tilt in [-tilt, tilt] {
                    layouts.push(OrientationLayout {
                        popout,
                        popout_offset,
                        target_offset,
                        tilt,
                    });
                }
            }
        }
    }
    layouts
}

/// One layout drawn uniformly from the orientation space, for calibration trials.
pub fn random_orientation_layout<R: Rng + ?Sized>(
    rng: &mut R,
    ring_radius: f64,
    tilt: f64,
) -> OrientationLayout {
    let mut half = || {
        if rng.random_bool(0.5) {
            ring_radius
        } else {
            -ring_radius
        }
    };
    let popout_offset = half();
    let target_offset = half();
    OrientationLayout {
        popout: if rng.random_bool(0.5) {
            Popout::First
        } else {
            Popout::Second
        },
        popout_offset,
        target_offset,
        tilt: if rng.random_bool(0.5) { tilt } else { -tilt },
    }
}
