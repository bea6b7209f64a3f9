mod common;

use std::thread::{self, JoinHandle};
use std::time::Duration;

use common::{
    CHANNEL_A, CHANNEL_B, RecordingDevice, RecordingDriver, SharedConsole, test_config,
    wait_until,
};
use hoptx::hop::{StepClock, StepHandle};
use hoptx::{Error, Lifecycle};

const TIMEOUT: Duration = Duration::from_secs(3);

// Test helpers to reduce boilerplate

fn spawn_lifecycle(
    driver: RecordingDriver,
    console: SharedConsole,
) -> (
    flume::Sender<()>,
    StepHandle,
    JoinHandle<hoptx::Result<()>>,
) {
    let (stop_tx, stop_rx) = flume::bounded(1);
    let (clock, handle) = StepClock::new();
    let join = thread::spawn(move || {
        let mut console = console;
        Lifecycle::new(test_config())
            .with_clock(Box::new(clock))
            .run(&driver, stop_rx, &mut console)
    });
    (stop_tx, handle, join)
}

#[test]
fn test_hops_until_stopped() {
    let device = RecordingDevice::new();
    let console = SharedConsole::default();
    let (stop_tx, clock, handle) =
        spawn_lifecycle(RecordingDriver::with(device.clone()), console.clone());

    assert!(wait_until(TIMEOUT, || console.contents().contains("Transmitter started")));
    assert!(wait_until(TIMEOUT, || device.samples() > 0), "Pipeline should stream");

    clock.tick();
    assert!(wait_until(TIMEOUT, || {
        console.contents().contains("Center frequency switched: 2460.000 MHz")
    }));
    clock.tick();
    assert!(wait_until(TIMEOUT, || {
        console.contents().contains("Center frequency switched: 2465.000 MHz")
    }));

    stop_tx.send(()).unwrap();
    handle.join().unwrap().unwrap();

    assert_eq!(device.tuned(), vec![CHANNEL_A, CHANNEL_B, CHANNEL_A]);
    let out = console.contents();
    assert!(out.trim_end().ends_with("Transmitter stopped"), "{out}");

    let after = device.samples();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(device.samples(), after, "No writes after teardown");
}

#[test]
fn test_stop_signal_disconnect_shuts_down() {
    let device = RecordingDevice::new();
    let console = SharedConsole::default();
    let (stop_tx, _clock, handle) =
        spawn_lifecycle(RecordingDriver::with(device.clone()), console.clone());

    drop(stop_tx);
    handle.join().unwrap().unwrap();
    assert!(console.contents().contains("Transmitter stopped"));
    assert_eq!(device.tuned(), vec![CHANNEL_A]);
}

#[test]
fn test_device_unavailable_skips_teardown() {
    let driver = RecordingDriver::absent();
    let mut console = Vec::new();
    let (_stop_tx, stop_rx) = flume::bounded(1);
    let (clock, _handle) = StepClock::new();

    let result = Lifecycle::new(test_config())
        .with_clock(Box::new(clock))
        .run(&driver, stop_rx, &mut console);

    assert!(matches!(result, Err(Error::DeviceUnavailable { .. })));
    assert_eq!(driver.opens(), 1);
    let out = String::from_utf8(console).unwrap();
    assert!(out.contains("Transmitter failed: device unavailable (mock=0)"), "{out}");
    // Nothing was started, so nothing is reported as stopped.
    assert!(!out.contains("Transmitter stopped"), "{out}");
}

#[test]
fn test_configuration_failure_is_unavailable() {
    let device = RecordingDevice::new();
    device.fail_sample_rate();
    let driver = RecordingDriver::with(device.clone());
    let (_stop_tx, stop_rx) = flume::bounded(1);
    let mut console = Vec::new();

    let result = Lifecycle::new(test_config()).run(&driver, stop_rx, &mut console);

    assert!(matches!(result, Err(Error::DeviceUnavailable { .. })));
    assert_eq!(device.tune_attempts(), 0);
    assert_eq!(device.samples(), 0);
}

#[test]
fn test_initial_tune_failure_never_streams() {
    let device = RecordingDevice::new();
    device.script_tunes(&[true]);
    let driver = RecordingDriver::with(device.clone());
    let (_stop_tx, stop_rx) = flume::bounded(1);
    let mut console = Vec::new();

    let result = Lifecycle::new(test_config()).run(&driver, stop_rx, &mut console);

    assert!(matches!(result, Err(Error::DeviceApplyFailure { .. })));
    thread::sleep(Duration::from_millis(20));
    assert_eq!(device.samples(), 0);
    let out = String::from_utf8(console).unwrap();
    assert!(out.contains("Transmitter failed: failed to apply"), "{out}");
    // The pipeline was built, so it was torn down.
    assert!(out.contains("Transmitter stopped"), "{out}");
}

#[test]
fn test_escalated_hop_failure_terminates() {
    let device = RecordingDevice::new();
    device.script_tunes(&[false, true, true, true]);
    let console = SharedConsole::default();
    let (_stop_tx, clock, handle) =
        spawn_lifecycle(RecordingDriver::with(device.clone()), console.clone());

    for attempt in 1..=2 {
        clock.tick();
        let line = format!("Frequency hop attempt {attempt} failed");
        assert!(wait_until(TIMEOUT, || console.contents().contains(&line)));
    }
    clock.tick();

    // No stop request: the fatal error alone ends the run.
    let result = handle.join().unwrap();
    match result {
        Err(Error::HopEscalated { failures, .. }) => assert_eq!(failures, 3),
        other => panic!("Expected HopEscalated, got {:?}", other),
    }
    let out = console.contents();
    assert!(
        out.contains("Transmitter failed: frequency hop failed 3 consecutive times"),
        "{out}"
    );
    assert!(out.contains("Transmitter stopped"));

    let after = device.samples();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(device.samples(), after);
}

#[test]
fn test_stuck_pipeline_times_out_on_shutdown() {
    let device = RecordingDevice::new();
    let release = device.block_writes();
    let driver = RecordingDriver::with(device.clone());
    let console = SharedConsole::default();
    let (stop_tx, stop_rx) = flume::bounded(1);
    let (clock, _handle) = StepClock::new();
    let grace = Duration::from_millis(50);

    let join = {
        let mut console = console.clone();
        thread::spawn(move || {
            Lifecycle::new(test_config())
                .with_clock(Box::new(clock))
                .with_grace(grace)
                .run(&driver, stop_rx, &mut console)
        })
    };
    assert!(wait_until(TIMEOUT, || device.parked_writes() > 0));

    stop_tx.send(()).unwrap();
    match join.join().unwrap() {
        Err(Error::ShutdownTimeout(waited)) => assert_eq!(waited, grace),
        other => panic!("Expected ShutdownTimeout, got {:?}", other),
    }
    let out = console.contents();
    assert!(out.contains("Shutdown failed: pipeline did not quiesce"), "{out}");
    assert!(out.contains("Transmitter stopped"), "{out}");

    drop(release);
}
