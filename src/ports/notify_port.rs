//! Signal alert delivery port.

use crate::domain::error::MeanrevError;
use crate::domain::live_signal::LiveSignal;

pub trait NotifyPort {
    fn notify(&self, signal: &LiveSignal) -> Result<(), MeanrevError>;
}
