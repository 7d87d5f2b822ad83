//! Integration test modules

mod flood_state;
mod mgmt_channel;
