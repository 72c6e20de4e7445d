//! Test utilities for kvgraph integration tests
//!
//! `GraphFixture` owns an isolated store (in memory or a sled directory that
//! is removed with the fixture) and a few helpers for building node data.

pub mod graph_fixture;
