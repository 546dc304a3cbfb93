//! Prints signal alerts to stdout.

use std::io::{self, Write};

use crate::domain::error::MeanrevError;
use crate::domain::live_signal::LiveSignal;
use crate::ports::notify_port::NotifyPort;

pub struct ConsoleNotifier;

impl NotifyPort for ConsoleNotifier {
    fn notify(&self, signal: &LiveSignal) -> Result<(), MeanrevError> {
        let mut out = io::stdout().lock();
        writeln!(out, "== {} ==", signal.subject())
            .and_then(|_| writeln!(out, "{}", signal.alert_message()))
            .and_then(|_| writeln!(out))
            .map_err(|e| MeanrevError::Notification {
                reason: e.to_string(),
            })
    }
}
