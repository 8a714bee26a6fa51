#![allow(dead_code)]

use fabric_sim::{
    time::Time,
    units::{Microsecs, Millisecs},
    ElementId, EndpointId,
};
use tracing_subscriber::EnvFilter;

/// Installs a test-friendly subscriber once per binary. Set `RUST_LOG` to see engine logs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn ep(id: usize) -> EndpointId {
    EndpointId::new(id)
}

pub fn el(id: usize) -> ElementId {
    ElementId::new(id)
}

pub fn ms(n: u64) -> Time {
    Millisecs::new(n).into_time()
}

pub fn us(n: u64) -> Time {
    Microsecs::new(n).into_time()
}
