//! Wall-clock driver for the internal clock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use sb_engine::VoiceSink;
use tracing::info;

use crate::controller::Controller;

/// Calls [`Controller::tick`] once per tick interval until `stop` is set,
/// then hands the controller back through the join handle.
pub struct ClockThread;

impl ClockThread {
    pub fn spawn<S>(mut controller: Controller<S>, stop: Arc<AtomicBool>) -> JoinHandle<Controller<S>>
    where
        S: VoiceSink + Send + 'static,
    {
        std::thread::spawn(move || {
            info!(bpm = controller.transport().bpm(), "clock thread started");
            let mut deadline = Instant::now();
            let mut ticks: u64 = 0;
            while !stop.load(Ordering::Relaxed) {
                controller.tick();
                ticks += 1;
                // Re-read each pass so tempo changes apply on the next tick.
                deadline += controller.tick_interval();
                let now = Instant::now();
                if deadline > now {
                    std::thread::sleep(deadline - now);
                } else {
                    deadline = now;
                }
            }
            info!(ticks, "clock thread stopped");
            controller
        })
    }
}
