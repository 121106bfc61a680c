//! Order domain: money math and the daily order-number sequencer

pub mod money;
pub mod sequencer;
