//! # M2 Server
//!
//! Process supervisor for the power/fault/state control core. Wires the
//! per-subsystem event loops onto plain OS threads and uses `tokio` only
//! for the command-dispatch/telemetry-broadcast task pair.
//!
//! There is no real socket accept loop here: the command task below
//! replays a fixed demo sequence in place of a connected client, and the
//! telemetry task logs each broadcast line instead of writing it to a
//! socket.

mod command;
mod error;
mod telemetry;

use std::env;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use m2_common::bitmap::OutputPortBits;
use m2_common::config::{ConfigLoader, CoreConfig};
use m2_common::fault::Bus;
use m2_common::power_state::PowerState;
use m2_common::sysinfo::SysInfo;
use m2_power::fault_mgr::FaultMgr;
use m2_power::motion::MotionEngine;
use m2_power::power::PowerSystem;
use m2_power::simulator::Simulator;
use m2_power::state::{Model, SystemEvent};

use command::CommandDispatcher;
use telemetry::TelemetryBroadcaster;

fn level_from_loglvl(v: u8) -> tracing::Level {
    match v {
        0 => tracing::Level::TRACE,
        1 => tracing::Level::DEBUG,
        2 => tracing::Level::INFO,
        3 => tracing::Level::WARN,
        _ => tracing::Level::ERROR,
    }
}

fn init_tracing() {
    let level = env::var("LOGLVL")
        .ok()
        .and_then(|s| s.parse::<u8>().ok())
        .map(level_from_loglvl)
        .unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .init();
}

fn load_config() -> CoreConfig {
    match env::args().nth(1).map(PathBuf::from) {
        Some(path) => match CoreConfig::load(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::error!(error = %e, "failed to load config");
                std::process::exit(-1);
            }
        },
        None => CoreConfig::default(),
    }
}

/// Mirrors both buses' target/actual state for the telemetry task, which
/// has no direct access to `PowerSystem` (owned solely by its event loop).
#[derive(Debug, Clone, Copy, Default)]
struct PowerStatusSnapshot {
    motor_actual: Option<PowerState>,
    motor_status: bool,
    comm_actual: Option<PowerState>,
    comm_status: bool,
}

enum PowerTask {
    Snapshot(SysInfo),
    Timeout,
    Command(String),
}

enum MotionTask {
    Snapshot(f64),
    Timeout,
}

#[tokio::main]
async fn main() {
    init_tracing();
    let config = load_config();
    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "config failed validation");
        std::process::exit(-1);
    }

    let run = Arc::new(AtomicBool::new(true));
    let shutdown_requested = Arc::new(AtomicBool::new(false));
    let output = Arc::new(Mutex::new(OutputPortBits::new()));
    let fault_mgr = Arc::new(Mutex::new(FaultMgr::new()));
    let model = Arc::new(Mutex::new(Model::new()));
    let power_status = Arc::new(Mutex::new(PowerStatusSnapshot::default()));
    let latest_timestamp = Arc::new(Mutex::new(0.0f64));
    {
        let mut m = model.lock().unwrap();
        m.handle_event(SystemEvent::CtrlReady);
    }

    let (power_tx, power_rx) = mpsc::channel::<PowerTask>();
    let (motion_tx, motion_rx) = mpsc::channel::<MotionTask>();

    tracing::info!("M2 server starting");

    // Thread: I/O producer. Sole writer of SysInfo; feeds both event loops.
    let io_handle = {
        let run = run.clone();
        let output = output.clone();
        let power_tx = power_tx.clone();
        let motion_tx = motion_tx.clone();
        let latest_timestamp = latest_timestamp.clone();
        let period = Duration::from_secs_f64(1.0 / config.io_sample_hz);
        let nominal = config.motor.nominal_voltage;
        thread::spawn(move || {
            let mut sim = Simulator::new(Default::default(), nominal);
            let mut t = 0.0;
            while run.load(Ordering::Relaxed) {
                t += period.as_secs_f64();
                let snapshot = {
                    let out = output.lock().unwrap();
                    sim.tick(&out, t)
                };
                *latest_timestamp.lock().unwrap() = snapshot.timestamp;
                if power_tx.send(PowerTask::Snapshot(snapshot)).is_err() {
                    break;
                }
                if motion_tx.send(MotionTask::Snapshot(snapshot.timestamp)).is_err() {
                    break;
                }
                thread::sleep(period);
            }
            tracing::info!("I/O producer exiting");
        })
    };

    // Thread: PowerSystem 1 Hz timeout poster.
    let power_timeout_handle = {
        let run = run.clone();
        let power_tx = power_tx.clone();
        thread::spawn(move || {
            while run.load(Ordering::Relaxed) {
                thread::sleep(Duration::from_secs(1));
                if power_tx.send(PowerTask::Timeout).is_err() {
                    break;
                }
            }
            tracing::info!("PowerSystem timeout poster exiting");
        })
    };

    // Thread: PowerSystem event loop. Sole mutator of PowerSubsystem
    // state and the command dispatcher.
    let power_handle = {
        let run = run.clone();
        let output = output.clone();
        let fault_mgr = fault_mgr.clone();
        let model = model.clone();
        let power_status = power_status.clone();
        let shutdown_requested = shutdown_requested.clone();
        let latest_timestamp = latest_timestamp.clone();
        let config = config.clone();
        thread::spawn(move || {
            let mut power = PowerSystem::new(&config);
            let mut dispatcher = CommandDispatcher::new();
            while run.load(Ordering::Relaxed) {
                match power_rx.recv_timeout(Duration::from_millis(500)) {
                    Ok(PowerTask::Snapshot(info)) => {
                        let outcome = {
                            let mut out = output.lock().unwrap();
                            power.process_tick(&info, &mut out, info.timestamp)
                        };
                        fault_mgr.lock().unwrap().update_power_faults(outcome.current_faults, info.timestamp);
                        let mut force_buses_off = false;
                        {
                            let mut model = model.lock().unwrap();
                            for change in outcome.changes {
                                let target = match change.bus {
                                    Bus::Motor => power.motor().target(),
                                    Bus::Comm => power.comm().target(),
                                };
                                if model.report_power_system_state_change(change, target) == Some(false) {
                                    force_buses_off = true;
                                }
                            }
                        }
                        if force_buses_off {
                            power.power_motor(false);
                            power.power_comm(false);
                        }
                        let mut status = power_status.lock().unwrap();
                        status.motor_actual = Some(power.motor().actual());
                        status.motor_status = power.motor().target() == PowerState::On;
                        status.comm_actual = Some(power.comm().actual());
                        status.comm_status = power.comm().target() == PowerState::On;
                    }
                    Ok(PowerTask::Timeout) => {
                        let now = *latest_timestamp.lock().unwrap();
                        let mut out = output.lock().unwrap();
                        let outcome = power.check_timeout(now, &mut out);
                        drop(out);
                        if outcome.current_faults.bits() != 0 {
                            fault_mgr.lock().unwrap().update_power_faults(outcome.current_faults, now);
                        }
                    }
                    Ok(PowerTask::Command(raw)) => {
                        let response = dispatcher.handle(&raw, &mut power);
                        if let Some(ack) = &response.ack {
                            tracing::debug!(?ack, "command ack");
                        }
                        if let Some(final_msg) = &response.final_msg {
                            tracing::info!(?final_msg, "command final");
                        }
                        if response.request_shutdown {
                            shutdown_requested.store(true, Ordering::Relaxed);
                        }
                    }
                    Err(mpsc::RecvTimeoutError::Timeout) => {}
                    Err(mpsc::RecvTimeoutError::Disconnected) => break,
                }
            }
            tracing::info!("PowerSystem event loop exiting");
        })
    };

    // Thread: MotionEngine 1 Hz timeout poster.
    let motion_timeout_handle = {
        let run = run.clone();
        let motion_tx = motion_tx.clone();
        thread::spawn(move || {
            while run.load(Ordering::Relaxed) {
                thread::sleep(Duration::from_secs(1));
                if motion_tx.send(MotionTask::Timeout).is_err() {
                    break;
                }
            }
            tracing::info!("MotionEngine timeout poster exiting");
        })
    };

    // Thread: MotionEngine event loop. Only the staleness watchdog is
    // built here; closed-loop force control and trajectory planning are
    // not.
    let motion_handle = {
        let run = run.clone();
        let fault_mgr = fault_mgr.clone();
        let model = model.clone();
        let stale_warn = config.stale_warn_secs;
        let stale_fault = config.stale_fault_secs;
        thread::spawn(move || {
            let mut engine = MotionEngine::new(stale_warn, stale_fault);
            let mut last_timestamp = 0.0;
            while run.load(Ordering::Relaxed) {
                match motion_rx.recv_timeout(Duration::from_millis(500)) {
                    Ok(MotionTask::Snapshot(timestamp)) => {
                        engine.note_control_timestamp(timestamp);
                        last_timestamp = timestamp;
                        let outcome = engine.check_staleness(timestamp);
                        let bit = MotionEngine::fault_bit_for(outcome);
                        fault_mgr.lock().unwrap().report_motion_staleness(bit, timestamp);
                        if matches!(bit, Some(m2_common::fault::FaultBit::StaleDataFault)) {
                            model.lock().unwrap().handle_event(SystemEvent::SafeModeRequested);
                        }
                    }
                    Ok(MotionTask::Timeout) => {
                        let outcome = engine.check_staleness(last_timestamp + stale_fault + 1.0);
                        let bit = MotionEngine::fault_bit_for(outcome);
                        fault_mgr.lock().unwrap().report_motion_staleness(bit, last_timestamp);
                    }
                    Err(mpsc::RecvTimeoutError::Timeout) => {}
                    Err(mpsc::RecvTimeoutError::Disconnected) => break,
                }
            }
            tracing::info!("MotionEngine event loop exiting");
        })
    };

    // Task: telemetry broadcaster. Stands in for the per-client task pool;
    // logs each line in place of a socket write.
    let telemetry_task = {
        let run = run.clone();
        let power_status = power_status.clone();
        let period = Duration::from_secs_f64(1.0 / config.telemetry_hz);
        tokio::spawn(async move {
            let mut broadcaster = TelemetryBroadcaster::new();
            while run.load(Ordering::Relaxed) {
                let status = *power_status.lock().unwrap();
                broadcaster.update_power_status(
                    status.motor_actual.unwrap_or_default(),
                    status.motor_status,
                    status.comm_actual.unwrap_or_default(),
                    status.comm_status,
                );
                for line in broadcaster.emit_all() {
                    tracing::trace!(%line, "telemetry broadcast");
                }
                tokio::time::sleep(period).await;
            }
        })
    };

    // Task: command dispatch. Replays a fixed demo sequence instead of
    // reading from a connected client (no socket accept loop in scope).
    let command_task = {
        let power_tx = power_tx.clone();
        tokio::spawn(async move {
            let demo = [
                r#"{"id":"cmd_power","sequence_id":1,"powerType":2,"status":true}"#.to_string(),
                r#"{"id":"cmd_echo","sequence_id":2,"msg":"hello"}"#.to_string(),
            ];
            for raw in demo {
                let _ = power_tx.send(PowerTask::Command(raw));
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        })
    };

    drop(power_tx);
    drop(motion_tx);

    loop {
        if shutdown_requested.load(Ordering::Relaxed) {
            tracing::info!("shutdown command received");
            break;
        }
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("ctrl-c received");
                break;
            }
            _ = tokio::time::sleep(Duration::from_millis(200)) => {}
        }
    }

    run.store(false, Ordering::Relaxed);
    command_task.abort();
    telemetry_task.abort();
    // LIFO join order relative to spawn.
    let _ = motion_handle.join();
    let _ = motion_timeout_handle.join();
    let _ = power_handle.join();
    let _ = power_timeout_handle.join();
    let _ = io_handle.join();
    tracing::info!("M2 server stopped");
}
