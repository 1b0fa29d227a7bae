use crate::error::ParseError;
use std::fmt;
use std::str::FromStr;

/// Sentinel lines delimiting the sections of a trial log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Marker {
    Start1,
    End1,
    Calib,
    Start2,
    End2,
}

impl Marker {
    pub const ALL: [Marker; 5] = [
        Marker::Start1,
        Marker::End1,
        Marker::Calib,
        Marker::Start2,
        Marker::End2,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Marker::Start1 => "START1",
            Marker::End1 => "END1",
            Marker::Calib => "CALIB",
            Marker::Start2 => "START2",
            Marker::End2 => "END2",
        }
    }

    /// The marker that must close the section this one opens, if any.
    pub fn closing(self) -> Option<Marker> {
        match self {
            Marker::Start1 => Some(Marker::End1),
            Marker::Start2 => Some(Marker::End2),
            _ => None,
        }
    }

    /// The opening marker this one closes, if any.
    pub fn opening(self) -> Option<Marker> {
        match self {
            Marker::End1 => Some(Marker::Start1),
            Marker::End2 => Some(Marker::Start2),
            _ => None,
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Marker {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Marker::ALL
            .into_iter()
            .find(|m| m.as_str() == s.trim())
            .ok_or_else(|| ParseError::malformed("marker", s))
    }
}

/// Protocol stages in canonical session order.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    BreakingTime,
    Preference,
    Equiluminance,
    Calibration,
    Orientation,
    Farewell,
}

impl Stage {
    pub fn next(&self) -> Option<Self> {
        use Stage::*;
        Some(match self {
            BreakingTime => Preference,
            Preference => Equiluminance,
            Equiluminance => Calibration,
            Calibration => Orientation,
            Orientation => Farewell,
            Farewell => return None,
        })
    }

    /// Marker written when the stage begins.
    pub fn opening_marker(&self) -> Option<Marker> {
        match self {
            Stage::BreakingTime => Some(Marker::Start1),
            Stage::Calibration => Some(Marker::Calib),
            Stage::Orientation => Some(Marker::Start2),
            _ => None,
        }
    }

    /// Marker written when the stage ends.
    pub fn closing_marker(&self) -> Option<Marker> {
        self.opening_marker().and_then(Marker::closing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_visit_markers_in_canonical_order() {
        let mut written = Vec::new();
        let mut stage = Some(Stage::default());
        while let Some(s) = stage {
            written.extend(s.opening_marker());
            written.extend(s.closing_marker());
            stage = s.next();
        }
        assert_eq!(written, Marker::ALL.to_vec());
    }

    #[test]
    fn markers_round_trip_through_text() {
        for m in Marker::ALL {
            assert_eq!(m.to_string().parse::<Marker>().unwrap(), m);
        }
        assert!("START3".parse::<Marker>().is_err());
    }
}
