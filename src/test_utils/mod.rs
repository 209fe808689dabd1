//! Shared fixtures for unit tests.

mod stub_gateway;

pub(crate) use stub_gateway::*;
