use colorpref_analysis::{Cue, LogContents, Report, ValidityWindow};
use colorpref_core::{
    BreakingLayout, BreakingRecord, BreakingTime, Color, Discrimination, Marker,
    OrientationLayout, OrientationOutcome, OrientationRecord, Popout, PreferenceRecord,
};
use colorpref_experiment::TrialLog;
use tempfile::tempdir;

const NAVY: Color = Color::new(3, 6, 24);

fn broke(offset: f64, t: f64) -> BreakingRecord {
    BreakingRecord {
        layout: BreakingLayout {
            color: NAVY,
            offset,
        },
        breaking_time: BreakingTime::Broke(t),
        passed: Some(true),
    }
}

fn discriminated(popout_offset: f64, correct: bool, rt: f64) -> OrientationRecord {
    OrientationRecord {
        layout: OrientationLayout {
            popout: Popout::Second,
            popout_offset,
            target_offset: -0.12,
            tilt: 1.5,
        },
        outcome: OrientationOutcome::Discriminated(Discrimination {
            response_time: rt,
            correct,
            visibility: 1,
            locations: None,
            color_seen: None,
        }),
    }
}

#[test]
fn two_appended_sessions_are_summarized_together() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("subject01.txt");

    {
        let mut log = TrialLog::append(&path).unwrap();
        log.record(&PreferenceRecord {
            ranks: vec![(NAVY, 1), (Color::new(8, 0, 0), 2)],
        })
        .unwrap();
        log.marker(Marker::Start1).unwrap();
        log.record(&broke(-0.0625, 1.5)).unwrap();
        log.marker(Marker::End1).unwrap();
    }
    {
        let mut log = TrialLog::append(&path).unwrap();
        log.marker(Marker::Start1).unwrap();
        log.record(&broke(0.0625, 2.5)).unwrap();
        log.record(&BreakingRecord {
            breaking_time: BreakingTime::TimedOut,
            ..broke(0.0625, 0.0)
        })
        .unwrap();
        log.marker(Marker::End1).unwrap();
        log.marker(Marker::Start2).unwrap();
        log.record(&discriminated(-0.12, true, 0.8)).unwrap();
        log.record(&discriminated(0.12, false, 0.9)).unwrap();
        log.marker(Marker::End2).unwrap();
    }

    let contents = LogContents::read(&path).unwrap();
    assert_eq!(contents.breaking.len(), 3);
    assert_eq!(contents.skipped, 0);

    let report = Report::build(&contents, ValidityWindow::default());
    let navy = report.breaking[0].result.as_ref().unwrap();
    assert_eq!(report.breaking[0].condition, "(3,6,24)");
    assert_eq!(navy.count, 2);
    assert_eq!(navy.mean, 2.0);
    assert_eq!(navy.std, 0.5);

    let valid = report.orientation_by_cue[0].result.as_ref().unwrap();
    assert_eq!(report.orientation_by_cue[0].condition, Cue::Valid.to_string());
    assert_eq!((valid.correct, valid.trials), (1, 1));
    let invalid = report.orientation_by_cue[1].result.as_ref().unwrap();
    assert_eq!(invalid.accuracy, 0.0);
    assert!(invalid.latency.is_none());

    assert_eq!(report.preferences[0].color, NAVY);
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempdir().unwrap();
    let err = LogContents::read(&dir.path().join("absent.txt")).unwrap_err();
    assert!(err.to_string().starts_with("I/O error"));
}
