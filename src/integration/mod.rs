//! Scenario tests over the scripted player

pub mod fixtures;

mod e2e;
