use colorpref_core::{Color, Frame, Key, LogLine, Marker, OrientationOutcome, Shape};
use colorpref_experiment::scene::{READY, TILT_QUESTION};
use colorpref_experiment::{
    EquiluminanceMethod, Session, SessionConfig, SimulatedRig, Subject, TrialLog,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Sees tilts of at least `threshold` degrees, reports the probe half a
/// second into the trial once it has appeared, and ranks colors in the
/// order they are shown.
struct Observer {
    threshold: f32,
    gabor_tilt: Option<f32>,
    probe_x: Option<f32>,
    asking_tilt: bool,
    ranking_keys: u8,
}

impl Observer {
    fn new(threshold: f32) -> Self {
        Self {
            threshold,
            gabor_tilt: None,
            probe_x: None,
            asking_tilt: false,
            ranking_keys: 0,
        }
    }
}

impl Subject for Observer {
    fn see(&mut self, frame: &Frame) {
        if frame.texts().any(|t| t == READY) {
            self.probe_x = None;
        }
        let masked = frame.count(|s| matches!(s, Shape::Mondrian { .. })) > 0;
        for item in &frame.items {
            match item.shape {
                Shape::Gabor { tilt_deg, .. } => self.gabor_tilt = Some(tilt_deg),
                Shape::CrossDisc { .. } if masked => self.probe_x = Some(item.pos.0),
                _ => {}
            }
        }
        self.asking_tilt = frame.texts().any(|t| t == TILT_QUESTION);
    }

    fn react(&mut self, allowed: &[Key], frames: u64) -> Option<Key> {
        let ready = allowed.contains(&Key::Left) || self.probe_x.is_some();
        (allowed.contains(&Key::Space) && ready && frames >= 30).then_some(Key::Space)
    }

    fn answer(&mut self, allowed: &[Key]) -> Option<Key> {
        if allowed.contains(&Key::Reset) {
            self.ranking_keys += 1;
            return Some(if self.ranking_keys % 2 == 1 {
                Key::Digit(self.ranking_keys / 2 + 1)
            } else {
                Key::Right
            });
        }
        if allowed.contains(&Key::Quit) {
            return Some(Key::Quit);
        }
        if allowed == Key::DIRECTIONS {
            let right = if self.asking_tilt {
                let tilt = self.gabor_tilt?;
                (tilt > 0.0) == (tilt.abs() >= self.threshold)
            } else {
                self.probe_x? > -0.4
            };
            return Some(if right { Key::Right } else { Key::Left });
        }
        Some(Key::Space)
    }
}

fn colors() -> Vec<Color> {
    vec![
        Color::new(8, 0, 0),
        Color::new(0, 3, 0),
        Color::new(0, 0, 36),
    ]
}

fn small_config(output: &std::path::Path) -> SessionConfig {
    let mut config = SessionConfig {
        output_path: output.to_path_buf(),
        colors: colors(),
        ..SessionConfig::default()
    };
    config.breaking.repetitions = 1;
    config.orientation.repetitions = 1;
    config
}

fn parse(text: &str) -> Vec<LogLine> {
    text.lines().map(|l| l.parse::<LogLine>().unwrap()).collect()
}

#[test]
fn full_session_writes_a_parseable_log() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("subject01.txt");
    let config = small_config(&path);
    let rig = SimulatedRig::new(config.refresh_rate).subject(Observer::new(1.6));
    let timer = rig.timer();
    let log = TrialLog::append(&path).unwrap();
    let mut session =
        Session::new(config, rig, timer, StdRng::seed_from_u64(2024), log).unwrap();
    let summary = session.run().unwrap();
    drop(session);

    assert_eq!(summary.breaking_trials, 6);
    assert_eq!(summary.extremes, Some((colors()[0], colors()[2])));
    assert_eq!(summary.tilt, 1.75);
    let calibration = summary.calibration.unwrap();
    assert!(calibration.descending.converged && calibration.ascending.converged);
    assert_eq!(summary.orientation_trials, 16);
    assert_eq!(summary.prime_reports, 0);

    let lines = parse(&std::fs::read_to_string(&path).unwrap());
    let markers: Vec<Marker> = lines
        .iter()
        .filter_map(|l| match l {
            LogLine::Marker(m) => Some(*m),
            _ => None,
        })
        .collect();
    assert_eq!(markers, Marker::ALL.to_vec());

    let breaking: Vec<_> = lines
        .iter()
        .filter_map(|l| match l {
            LogLine::Breaking(r) => Some(r),
            _ => None,
        })
        .collect();
    assert_eq!(breaking.len(), 6);
    assert!(breaking.iter().all(|r| r.passed == Some(true)));
    assert!(breaking.iter().all(|r| r.breaking_time.seconds().unwrap() <= 0.5));

    assert!(lines.contains(&LogLine::CalibratedTilt(1.75)));
    assert!(lines.iter().any(|l| matches!(l, LogLine::Preference(_))));
    assert!(lines.iter().any(|l| matches!(l, LogLine::Equiluminant(_))));

    let orientation: Vec<_> = lines
        .iter()
        .filter_map(|l| match l {
            LogLine::Orientation(r) => Some(r),
            _ => None,
        })
        .collect();
    assert_eq!(orientation.len(), 16);
    for record in orientation {
        assert_eq!(record.layout.tilt.abs(), 1.75);
        let OrientationOutcome::Discriminated(d) = record.outcome else {
            panic!("unexpected prime report");
        };
        assert!(d.correct);
        assert_eq!(d.visibility, 0);
    }
}

#[test]
fn escape_keeps_what_was_written() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("aborted.txt");
    let config = small_config(&path);
    let rig = SimulatedRig::new(config.refresh_rate)
        .answers([Key::Space])
        .key_after(100, Key::Escape);
    let timer = rig.timer();
    let log = TrialLog::append(&path).unwrap();
    let mut session = Session::new(config, rig, timer, StdRng::seed_from_u64(1), log).unwrap();
    let err = session.run().unwrap_err();
    assert!(err.is_abort());
    drop(session);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "START1\n");
}

#[test]
fn disabled_stages_fall_back_to_configured_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stage2.txt");
    let mut config = small_config(&path);
    config.stages.breaking_time = false;
    config.stages.preference = false;
    config.stages.equiluminance = EquiluminanceMethod::Skip;
    config.stages.calibrate_tilt = false;
    config.orientation.ask_locations = false;
    config.orientation.ask_color_seen = false;
    let rig = SimulatedRig::new(config.refresh_rate).subject(Observer::new(1.0));
    let timer = rig.timer();
    let mut session =
        Session::new(config, rig, timer, StdRng::seed_from_u64(5), TrialLog::new(Vec::new()))
            .unwrap();
    let summary = session.run().unwrap();
    assert_eq!(summary.pair, (colors()[0], colors()[1]));
    assert_eq!(summary.tilt, 5.0);
    assert!(summary.calibration.is_none());

    let (_, log) = session.into_parts();
    let text = String::from_utf8(log.get_ref().clone()).unwrap();
    let lines = parse(&text);
    assert_eq!(lines.first(), Some(&LogLine::Marker(Marker::Start2)));
    assert_eq!(lines.last(), Some(&LogLine::Marker(Marker::End2)));
    assert_eq!(lines.len(), 18);
    assert!(text.lines().nth(1).unwrap().split_whitespace().count() == 4);
}

#[test]
fn tilt_only_calibration_converges_to_the_same_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = small_config(&dir.path().join("calib.txt"));
    config.stages.breaking_time = false;
    config.stages.preference = false;
    config.stages.equiluminance = EquiluminanceMethod::Skip;
    config.stages.orientation = false;
    config.staircase.follow_up_questions = false;
    let rig = SimulatedRig::new(config.refresh_rate).subject(Observer::new(1.6));
    let timer = rig.timer();
    let mut session =
        Session::new(config, rig, timer, StdRng::seed_from_u64(11), TrialLog::new(Vec::new()))
            .unwrap();
    let summary = session.run().unwrap();
    let calibration = summary.calibration.unwrap();
    assert!(calibration.descending.converged && calibration.ascending.converged);
    assert_eq!(summary.tilt, 1.75);

    let (_, log) = session.into_parts();
    let text = String::from_utf8(log.get_ref().clone()).unwrap();
    let lines = parse(&text);
    assert_eq!(lines.first(), Some(&LogLine::Marker(Marker::Calib)));
    assert!(text.trim_end().lines().last().unwrap().starts_with("calibratedTilt:"));
}
