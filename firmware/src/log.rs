//! Firmware log lines. On the MCU these go out over defmt-RTT; host builds
//! print the same text so the wiring can be exercised off-target.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use turret_core::scheduler::{TaskSpec, TaskStats};
use turret_core::tasks::CameraStats;
use turret_core::telemetry::TransitionRecord;

#[cfg(target_os = "none")]
pub fn log_boot(task_count: usize) {
    defmt::info!("turret: controller up, {} tasks registered", task_count);
}

#[cfg(not(target_os = "none"))]
pub fn log_boot(task_count: usize) {
    println!("turret: controller up, {task_count} tasks registered");
}

#[cfg(target_os = "none")]
pub fn log_transition(record: &TransitionRecord) {
    defmt::info!(
        "turret: #{} {} -> {} ({}) t={}ms",
        record.sequence,
        record.from.label(),
        record.to.label(),
        record.cause.label(),
        record.at
    );
}

#[cfg(not(target_os = "none"))]
pub fn log_transition(record: &TransitionRecord) {
    println!(
        "turret: #{} {} -> {} ({}) t={}ms",
        record.sequence,
        record.from.label(),
        record.to.label(),
        record.cause.label(),
        record.at
    );
}

#[cfg(target_os = "none")]
pub fn log_homing(started: bool, at: u64) {
    if started {
        defmt::info!("yaw: homing started t={}ms", at);
    } else {
        defmt::info!("yaw: homed, encoder zeroed t={}ms", at);
    }
}

#[cfg(not(target_os = "none"))]
pub fn log_homing(started: bool, at: u64) {
    if started {
        println!("yaw: homing started t={at}ms");
    } else {
        println!("yaw: homed, encoder zeroed t={at}ms");
    }
}

#[cfg(target_os = "none")]
pub fn log_task_stats(spec: &TaskSpec, stats: &TaskStats) {
    if stats.late_runs > 0 {
        defmt::warn!(
            "sched:{} runs={} late={} worst={}ms",
            spec.name,
            stats.runs,
            stats.late_runs,
            stats.max_lateness_ms
        );
    } else {
        defmt::info!("sched:{} runs={} on time", spec.name, stats.runs);
    }
}

#[cfg(not(target_os = "none"))]
pub fn log_task_stats(spec: &TaskSpec, stats: &TaskStats) {
    if stats.late_runs > 0 {
        println!(
            "sched:{} runs={} late={} worst={}ms",
            spec.name, stats.runs, stats.late_runs, stats.max_lateness_ms
        );
    } else {
        println!("sched:{} runs={} on time", spec.name, stats.runs);
    }
}

#[cfg(target_os = "none")]
pub fn log_camera_stats(stats: &CameraStats) {
    match stats.last_error {
        Some(error) => defmt::warn!(
            "camera: accepted={} rejected={} last={}",
            stats.accepted,
            stats.rejected,
            defmt::Display2Format(&error)
        ),
        None => defmt::info!("camera: accepted={} rejected=0", stats.accepted),
    }
}

#[cfg(not(target_os = "none"))]
pub fn log_camera_stats(stats: &CameraStats) {
    match stats.last_error {
        Some(error) => println!(
            "camera: accepted={} rejected={} last={error}",
            stats.accepted, stats.rejected
        ),
        None => println!("camera: accepted={} rejected=0", stats.accepted),
    }
}
