mod common;

use std::time::Duration;

use common::{driver_failure, read_of, Call, RecordingDriver};
use labjack_diag::{
    DaqError, Handle, ScanChannel, ScanList, StreamRead, StreamSettings, StreamViewer,
};

fn two_channel_list() -> ScanList {
    ScanList(vec![
        ScanChannel {
            name: "AIN0".to_string(),
            address: 0,
        },
        ScanChannel {
            name: "AIN1".to_string(),
            address: 2,
        },
    ])
}

fn settings(scans_per_read: usize) -> StreamSettings {
    StreamSettings {
        scan_rate: 1000.0,
        scans_per_read,
        window_len: 10,
        tick_period: Duration::ZERO,
    }
}

#[test]
fn test_start_passes_scan_parameters() {
    let mut driver = RecordingDriver::new();
    let viewer = StreamViewer::start(&mut driver, Handle(7), &two_channel_list(), settings(128))
        .unwrap();
    viewer.finish().unwrap();

    assert_eq!(
        driver.calls,
        vec![
            Call::StreamStart(Handle(7), 128, vec![0, 2], 1000.0),
            Call::StreamStop(Handle(7)),
            Call::Close(Handle(7)),
        ]
    );
}

#[test]
fn test_tick_splits_even_and_odd_samples() {
    let mut driver = RecordingDriver::new().with_reads(vec![Ok(read_of(vec![
        0.1, 25.0, 0.2, 25.1, 0.3, 25.2,
    ]))]);
    let mut viewer =
        StreamViewer::start(&mut driver, Handle(1), &two_channel_list(), settings(3)).unwrap();

    let report = viewer.tick().unwrap();

    assert_eq!(report.tick, 1);
    assert_eq!(report.scans, 3);
    assert_eq!(viewer.vibration().latest(), Some(&vec![0.1, 0.2, 0.3]));
    assert_eq!(viewer.temperature().latest(), Some(&vec![25.0, 25.1, 25.2]));
}

#[test]
fn test_windows_keep_last_ten_batches() {
    let mut driver = RecordingDriver::new();
    let mut viewer =
        StreamViewer::start(&mut driver, Handle(1), &two_channel_list(), settings(2)).unwrap();

    for _ in 0..15 {
        viewer.tick().unwrap();
    }

    assert_eq!(viewer.vibration().len(), 10);
    assert_eq!(viewer.temperature().len(), 10);
    // Generated batch n starts at n * 10; ticks 6..=15 survive, oldest first
    let firsts: Vec<f64> = viewer.vibration().iter().map(|b| b[0]).collect();
    let expected: Vec<f64> = (6..=15).map(|n| (n * 10) as f64).collect();
    assert_eq!(firsts, expected);
    assert_eq!(viewer.temperature().latest(), Some(&vec![-150.0, -151.0]));
}

#[test]
fn test_backlog_drops_stale_buffers() {
    let backlogged = |first: f64, backlog: i32| StreamRead {
        data: vec![first, 0.0, first + 1.0, 0.0],
        device_backlog: 0,
        driver_backlog: backlog,
    };
    let mut driver = RecordingDriver::new().with_reads(vec![
        Ok(backlogged(1.0, 5)),
        Ok(backlogged(3.0, 3)),
        Ok(backlogged(5.0, 1)),
    ]);
    let mut viewer =
        StreamViewer::start(&mut driver, Handle(1), &two_channel_list(), settings(2)).unwrap();

    let report = viewer.tick().unwrap();

    assert_eq!(report.dropped, 2);
    assert_eq!(viewer.dropped_total(), 2);
    assert_eq!(viewer.vibration().len(), 1);
    assert_eq!(viewer.vibration().latest(), Some(&vec![5.0, 6.0]));
    drop(viewer);
    assert_eq!(driver.count(|c| matches!(c, Call::StreamRead(_))), 3);
}

#[test]
fn test_tick_timestamps_follow_scan_rate() {
    let mut driver = RecordingDriver::new();
    let mut viewer =
        StreamViewer::start(&mut driver, Handle(1), &two_channel_list(), settings(500)).unwrap();

    let first = viewer.tick().unwrap();
    let second = viewer.tick().unwrap();

    // 500 scans at 1 kHz are half a second apart
    assert_eq!(
        (second.timestamp - first.timestamp).num_milliseconds(),
        500
    );
}

#[test]
fn test_timestamps_use_rate_chosen_by_device() {
    let mut driver = RecordingDriver::new().with_reported_rate(250.0);
    let mut viewer =
        StreamViewer::start(&mut driver, Handle(1), &two_channel_list(), settings(500)).unwrap();

    let first = viewer.tick().unwrap();
    let second = viewer.tick().unwrap();

    assert_eq!(
        (second.timestamp - first.timestamp).num_milliseconds(),
        2000
    );
}

#[test]
fn test_unusable_scan_rate_stops_and_closes() {
    for rate in [0.0, -10.0, f64::INFINITY, f64::NAN] {
        let mut driver = RecordingDriver::new().with_reported_rate(rate);

        let result = StreamViewer::start(&mut driver, Handle(3), &two_channel_list(), settings(4));

        assert!(matches!(result, Err(DaqError::InvalidScanRate(_))));
        assert_eq!(
            driver.calls[1..],
            [Call::StreamStop(Handle(3)), Call::Close(Handle(3))]
        );
        assert_eq!(driver.count(|c| matches!(c, Call::StreamRead(_))), 0);
    }
}

#[test]
fn test_read_failure_propagates() {
    let mut driver =
        RecordingDriver::new().with_reads(vec![Err(driver_failure("stream_read"))]);
    let mut viewer =
        StreamViewer::start(&mut driver, Handle(1), &two_channel_list(), settings(2)).unwrap();

    let result = viewer.tick();

    assert!(matches!(
        result,
        Err(DaqError::Driver {
            operation: "stream_read",
            ..
        })
    ));
    assert!(viewer.vibration().is_empty());
}

#[test]
fn test_odd_length_read_is_rejected() {
    let mut driver = RecordingDriver::new().with_reads(vec![Ok(read_of(vec![1.0, 2.0, 3.0]))]);
    let mut viewer =
        StreamViewer::start(&mut driver, Handle(1), &two_channel_list(), settings(2)).unwrap();

    assert!(matches!(
        viewer.tick(),
        Err(DaqError::PartialScan {
            samples: 3,
            channels: 2
        })
    ));
}

#[test]
fn test_wrong_scan_list_length_closes_handle() {
    let mut driver = RecordingDriver::new();
    let mut list = two_channel_list();
    list.0.truncate(1);

    let result = StreamViewer::start(&mut driver, Handle(4), &list, settings(2));

    assert!(matches!(
        result,
        Err(DaqError::ScanListMismatch {
            expected: 2,
            actual: 1
        })
    ));
    assert_eq!(driver.calls, vec![Call::Close(Handle(4))]);
}
