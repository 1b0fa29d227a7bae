//! Trial configurations and the trial-log line codec.
//!
//! Every record type renders itself with `Display` in the exact line format
//! the readers expect and parses back with `FromStr`.

use crate::color::Color;
use crate::error::ParseError;
use crate::phase::Marker;
use std::fmt;
use std::str::FromStr;

/// Logged in place of a breaking time when the probe never broke suppression.
pub const DID_NOT_BREAK: f64 = 99999.0;

pub const PREFERENCE_PREFIX: &str = "preferences:";
pub const EQUILUMINANCE_PREFIX: &str = "equiluminantColor:";
pub const CALIBRATED_TILT_PREFIX: &str = "calibratedTilt:";
pub const PRIME_SEEN_TOKEN: &str = "PRIME_SEEN";

fn flag(b: bool) -> &'static str {
    if b { "True" } else { "False" }
}

fn parse_flag(s: &str) -> Result<bool, ParseError> {
    match s {
        "True" => Ok(true),
        "False" => Ok(false),
        _ => Err(ParseError::malformed("boolean", s)),
    }
}

fn parse_f64(s: &str, what: &'static str) -> Result<f64, ParseError> {
    s.parse::<f64>().map_err(|_| ParseError::malformed(what, s))
}

fn tuple_fields<'a>(s: &'a str, what: &'static str) -> Result<Vec<&'a str>, ParseError> {
    let inner = s
        .strip_prefix('(')
        .and_then(|r| r.strip_suffix(')'))
        .ok_or_else(|| ParseError::malformed(what, s))?;
    Ok(inner.split(',').map(str::trim).collect())
}

fn expect_tokens(tokens: &[&str], expected: usize) -> Result<(), ParseError> {
    if tokens.len() == expected {
        Ok(())
    } else {
        Err(ParseError::TokenCount {
            expected,
            found: tokens.len(),
        })
    }
}

/// Stage-1 configuration: probe color and its horizontal offset from the box center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakingLayout {
    pub color: Color,
    pub offset: f64,
}

/// Which of the two matched colors the popout element carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Popout {
    First,
    Second,
}

impl Popout {
    pub fn index(self) -> u8 {
        match self {
            Popout::First => 1,
            Popout::Second => 2,
        }
    }

    pub fn from_index(i: u8) -> Option<Self> {
        match i {
            1 => Some(Popout::First),
            2 => Some(Popout::Second),
            _ => None,
        }
    }
}

/// Stage-2 configuration.
///
/// Offsets are vertical, relative to the ring center; their sign selects the
/// upper (`> 0`) or lower half. A positive tilt is clockwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationLayout {
    pub popout: Popout,
    pub popout_offset: f64,
    pub target_offset: f64,
    pub tilt: f64,
}

impl OrientationLayout {
    /// The popout element and the target share a half of the ring.
    pub fn is_cued(&self) -> bool {
        (self.popout_offset > 0.0) == (self.target_offset > 0.0)
    }
}

impl fmt::Display for OrientationLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({},{},{},{})",
            self.popout.index(),
            self.popout_offset,
            self.target_offset,
            self.tilt
        )
    }
}

impl FromStr for OrientationLayout {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields = tuple_fields(s, "layout")?;
        let [popout, pop, target, tilt] = fields.as_slice() else {
            return Err(ParseError::malformed("layout", s));
        };
        let popout = popout
            .parse::<u8>()
            .ok()
            .and_then(Popout::from_index)
            .ok_or_else(|| ParseError::malformed("popout index", popout))?;
        Ok(Self {
            popout,
            popout_offset: parse_f64(pop, "popout offset")?,
            target_offset: parse_f64(target, "target offset")?,
            tilt: parse_f64(tilt, "tilt")?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BreakingTime {
    Broke(f64),
    TimedOut,
}

impl BreakingTime {
    pub fn seconds(self) -> Option<f64> {
        match self {
            BreakingTime::Broke(s) => Some(s),
            BreakingTime::TimedOut => None,
        }
    }
}

impl fmt::Display for BreakingTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreakingTime::Broke(s) => write!(f, "{s}"),
            BreakingTime::TimedOut => write!(f, "{DID_NOT_BREAK}"),
        }
    }
}

impl FromStr for BreakingTime {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let v = parse_f64(s, "breaking time")?;
        Ok(if v >= DID_NOT_BREAK {
            BreakingTime::TimedOut
        } else {
            BreakingTime::Broke(v)
        })
    }
}

/// `<color> <offset> <breakingTime> <passed>`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakingRecord {
    pub layout: BreakingLayout,
    pub breaking_time: BreakingTime,
    /// `None` when the location question was not asked.
    pub passed: Option<bool>,
}

impl fmt::Display for BreakingRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.layout.color,
            self.layout.offset,
            self.breaking_time,
            self.passed.map_or("None", flag)
        )
    }
}

impl FromStr for BreakingRecord {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = s.split_whitespace().collect();
        expect_tokens(&tokens, 4)?;
        Ok(Self {
            layout: BreakingLayout {
                color: tokens[0].parse()?,
                offset: parse_f64(tokens[1], "offset")?,
            },
            breaking_time: tokens[2].parse()?,
            passed: match tokens[3] {
                "None" => None,
                t => Some(parse_flag(t)?),
            },
        })
    }
}

/// Halves of the box the subject reported seeing patches in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LocationsSeen {
    pub upper: bool,
    pub lower: bool,
}

impl fmt::Display for LocationsSeen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", flag(self.upper), flag(self.lower))
    }
}

impl FromStr for LocationsSeen {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields = tuple_fields(s, "locations")?;
        let [upper, lower] = fields.as_slice() else {
            return Err(ParseError::malformed("locations", s));
        };
        Ok(Self {
            upper: parse_flag(upper)?,
            lower: parse_flag(lower)?,
        })
    }
}

/// Answer to "which of the colors did you see", logged by the key used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSeen {
    First,
    Second,
    Both,
}

impl ColorSeen {
    pub fn token(self) -> &'static str {
        match self {
            ColorSeen::First => "left",
            ColorSeen::Second => "right",
            ColorSeen::Both => "space",
        }
    }
}

impl FromStr for ColorSeen {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(ColorSeen::First),
            "right" => Ok(ColorSeen::Second),
            "space" => Ok(ColorSeen::Both),
            _ => Err(ParseError::malformed("color seen", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Discrimination {
    pub response_time: f64,
    pub correct: bool,
    pub visibility: u8,
    pub locations: Option<LocationsSeen>,
    pub color_seen: Option<ColorSeen>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrientationOutcome {
    /// The subject reported the prime; no discrimination was run.
    PrimeReported,
    Discriminated(Discrimination),
}

/// `<layout> <responseTime> <passed> <rating> [<locations>] [<colorSeen>]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationRecord {
    pub layout: OrientationLayout,
    pub outcome: OrientationOutcome,
}

impl fmt::Display for OrientationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            OrientationOutcome::PrimeReported => write!(f, "{} {PRIME_SEEN_TOKEN}", self.layout),
            OrientationOutcome::Discriminated(d) => {
                write!(
                    f,
                    "{} {} {} {}",
                    self.layout,
                    d.response_time,
                    flag(d.correct),
                    d.visibility
                )?;
                if let Some(loc) = d.locations {
                    write!(f, " {loc}")?;
                }
                if let Some(seen) = d.color_seen {
                    write!(f, " {}", seen.token())?;
                }
                Ok(())
            }
        }
    }
}

impl FromStr for OrientationRecord {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = s.split_whitespace().collect();
        let Some(first) = tokens.first() else {
            return Err(ParseError::TokenCount {
                expected: 4,
                found: 0,
            });
        };
        let layout: OrientationLayout = first.parse()?;
        if tokens.len() == 2 && tokens[1] == PRIME_SEEN_TOKEN {
            return Ok(Self {
                layout,
                outcome: OrientationOutcome::PrimeReported,
            });
        }
        if !(4..=6).contains(&tokens.len()) {
            return Err(ParseError::TokenCount {
                expected: 4,
                found: tokens.len(),
            });
        }
        let mut locations = None;
        let mut color_seen = None;
        for extra in &tokens[4..] {
            if extra.starts_with('(') && locations.is_none() && color_seen.is_none() {
                locations = Some(extra.parse()?);
            } else if color_seen.is_none() {
                color_seen = Some(extra.parse()?);
            } else {
                return Err(ParseError::malformed("orientation record", s));
            }
        }
        Ok(Self {
            layout,
            outcome: OrientationOutcome::Discriminated(Discrimination {
                response_time: parse_f64(tokens[1], "response time")?,
                correct: parse_flag(tokens[2])?,
                visibility: tokens[3]
                    .parse()
                    .map_err(|_| ParseError::malformed("visibility rating", tokens[3]))?,
                locations,
                color_seen,
            }),
        })
    }
}

/// `preferences: <color><rank> ...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceRecord {
    pub ranks: Vec<(Color, u8)>,
}

impl PreferenceRecord {
    pub fn holder_of(&self, rank: u8) -> Option<Color> {
        self.ranks.iter().find(|(_, r)| *r == rank).map(|(c, _)| *c)
    }
}

impl fmt::Display for PreferenceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(PREFERENCE_PREFIX)?;
        for (color, rank) in &self.ranks {
            write!(f, " {color}{rank}")?;
        }
        Ok(())
    }
}

impl FromStr for PreferenceRecord {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .trim()
            .strip_prefix(PREFERENCE_PREFIX)
            .or_else(|| s.trim().strip_prefix('p'))
            .ok_or_else(|| ParseError::malformed("preference line", s))?;
        let ranks = body
            .split_whitespace()
            .map(|token| {
                let split = token
                    .rfind(')')
                    .ok_or_else(|| ParseError::malformed("preference token", token))?;
                let (color, rank) = token.split_at(split + 1);
                let rank = rank
                    .parse::<u8>()
                    .map_err(|_| ParseError::malformed("rank", token))?;
                Ok((color.parse::<Color>()?, rank))
            })
            .collect::<Result<Vec<_>, ParseError>>()?;
        if ranks.is_empty() {
            return Err(ParseError::malformed("preference line", s));
        }
        Ok(Self { ranks })
    }
}

/// One staircase trial: `<staircase> <tilt> <correct 1|0> <streak> <reversals>`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationStep {
    pub staircase: usize,
    pub tilt: f64,
    pub correct: bool,
    pub streak: u8,
    pub reversals: u8,
}

impl fmt::Display for CalibrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.staircase,
            self.tilt,
            u8::from(self.correct),
            self.streak,
            self.reversals
        )
    }
}

impl FromStr for CalibrationStep {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = s.split_whitespace().collect();
        expect_tokens(&tokens, 5)?;
        let int = |t: &str, what| t.parse::<u8>().map_err(|_| ParseError::malformed(what, t));
        Ok(Self {
            staircase: tokens[0]
                .parse()
                .map_err(|_| ParseError::malformed("staircase index", tokens[0]))?,
            tilt: parse_f64(tokens[1], "tilt")?,
            correct: match int(tokens[2], "correct flag")? {
                0 => false,
                1 => true,
                _ => return Err(ParseError::malformed("correct flag", tokens[2])),
            },
            streak: int(tokens[3], "streak")?,
            reversals: int(tokens[4], "reversals")?,
        })
    }
}

/// Any line of a trial log.
#[derive(Debug, Clone, PartialEq)]
pub enum LogLine {
    Blank,
    Marker(Marker),
    Breaking(BreakingRecord),
    Orientation(OrientationRecord),
    Preference(PreferenceRecord),
    Equiluminant(Color),
    Calibration(CalibrationStep),
    CalibratedTilt(f64),
}

impl FromStr for LogLine {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.trim();
        if line.is_empty() {
            return Ok(LogLine::Blank);
        }
        if let Ok(marker) = line.parse::<Marker>() {
            return Ok(LogLine::Marker(marker));
        }
        if let Some(rest) = line.strip_prefix(EQUILUMINANCE_PREFIX) {
            return Ok(LogLine::Equiluminant(rest.trim().parse()?));
        }
        if let Some(rest) = line.strip_prefix(CALIBRATED_TILT_PREFIX) {
            return Ok(LogLine::CalibratedTilt(parse_f64(rest.trim(), "tilt")?));
        }
        if line.starts_with(PREFERENCE_PREFIX) || line.starts_with("p ") || line.starts_with("p(")
        {
            return Ok(LogLine::Preference(line.parse()?));
        }
        let first = line.split_whitespace().next().unwrap_or_default();
        if first.starts_with('(') {
            return match first.matches(',').count() {
                2 => Ok(LogLine::Breaking(line.parse()?)),
                3 => Ok(LogLine::Orientation(line.parse()?)),
                _ => Err(ParseError::Unrecognized(line.to_string())),
            };
        }
        if first.chars().all(|c| c.is_ascii_digit()) {
            return Ok(LogLine::Calibration(line.parse()?));
        }
        Err(ParseError::Unrecognized(line.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> OrientationLayout {
        OrientationLayout {
            popout: Popout::First,
            popout_offset: -0.12,
            target_offset: 0.12,
            tilt: 5.0,
        }
    }

    #[test]
    fn breaking_line_matches_reader_format() {
        let rec = BreakingRecord {
            layout: BreakingLayout {
                color: Color::new(3, 6, 24),
                offset: -0.0625,
            },
            breaking_time: BreakingTime::Broke(1.2345),
            passed: Some(true),
        };
        let line = rec.to_string();
        assert_eq!(line, "(3,6,24) -0.0625 1.2345 True");
        assert_eq!(line.parse::<BreakingRecord>().unwrap(), rec);
    }

    #[test]
    fn timeout_writes_sentinel() {
        let rec = BreakingRecord {
            layout: BreakingLayout {
                color: Color::new(8, 0, 0),
                offset: 0.0625,
            },
            breaking_time: BreakingTime::TimedOut,
            passed: None,
        };
        assert_eq!(rec.to_string(), "(8,0,0) 0.0625 99999 None");
        let back: BreakingRecord = rec.to_string().parse().unwrap();
        assert_eq!(back.breaking_time, BreakingTime::TimedOut);
        assert_eq!(back.passed, None);
    }

    #[test]
    fn orientation_line_with_optional_answers() {
        let rec = OrientationRecord {
            layout: layout(),
            outcome: OrientationOutcome::Discriminated(Discrimination {
                response_time: 0.734,
                correct: true,
                visibility: 0,
                locations: Some(LocationsSeen {
                    upper: true,
                    lower: false,
                }),
                color_seen: Some(ColorSeen::First),
            }),
        };
        let line = rec.to_string();
        assert_eq!(line, "(1,-0.12,0.12,5) 0.734 True 0 (True,False) left");
        assert_eq!(line.parse::<OrientationRecord>().unwrap(), rec);
        assert!(!rec.layout.is_cued());

        let short: OrientationRecord = "(2,0.12,0.12,-4.5) 0.5 False 2".parse().unwrap();
        assert!(short.layout.is_cued());
        assert_eq!(short.layout.popout, Popout::Second);
    }

    #[test]
    fn prime_reported_line() {
        let rec = OrientationRecord {
            layout: layout(),
            outcome: OrientationOutcome::PrimeReported,
        };
        assert_eq!(rec.to_string(), "(1,-0.12,0.12,5) PRIME_SEEN");
        assert_eq!(
            rec.to_string().parse::<OrientationRecord>().unwrap().outcome,
            OrientationOutcome::PrimeReported
        );
    }

    #[test]
    fn preference_line_accepts_both_prefixes() {
        let rec: PreferenceRecord = "preferences: (8,0,0)2 (4,2,0)1 ".parse().unwrap();
        assert_eq!(rec.holder_of(1), Some(Color::new(4, 2, 0)));
        assert_eq!(rec.to_string(), "preferences: (8,0,0)2 (4,2,0)1");
        let legacy: PreferenceRecord = "p (8,0,0)1 (4,2,0)2".parse().unwrap();
        assert_eq!(legacy.holder_of(2), Some(Color::new(4, 2, 0)));
    }

    #[test]
    fn classifies_lines() {
        assert_eq!("END1".parse::<LogLine>().unwrap(), LogLine::Marker(Marker::End1));
        assert!(matches!(
            "(3,6,24) -0.0625 1.5 True".parse::<LogLine>().unwrap(),
            LogLine::Breaking(_)
        ));
        assert!(matches!(
            "(1,0.12,0.12,5) 0.4 True 1".parse::<LogLine>().unwrap(),
            LogLine::Orientation(_)
        ));
        assert!(matches!(
            "0 5 1 1 0".parse::<LogLine>().unwrap(),
            LogLine::Calibration(_)
        ));
        assert_eq!(
            "equiluminantColor: (8,0,0)".parse::<LogLine>().unwrap(),
            LogLine::Equiluminant(Color::new(8, 0, 0))
        );
        assert_eq!(
            "calibratedTilt: 2.75".parse::<LogLine>().unwrap(),
            LogLine::CalibratedTilt(2.75)
        );
        assert_eq!("  ".parse::<LogLine>().unwrap(), LogLine::Blank);
        assert!("(3,6,24) -0.0625".parse::<LogLine>().is_err());
        assert!("garbage".parse::<LogLine>().is_err());
    }
}
