//! Core types: time intervals, slot grids, availability

pub mod availability;
pub mod time;
pub mod tracing;

pub use availability::{
    AvailabilityResult, CandidateSlot, GridError, SlotGrid, compute_availability, free_slots,
    grid_window,
};
pub use time::{
    EmptyIntervalError, ParsedTime, TimeInterval, parse_datetime, parse_time, resolve_local,
};
pub use crate::tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
