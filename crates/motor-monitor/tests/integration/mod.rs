//! Integration tests for motor-monitor.
//!
//! These tests verify the interaction between components over a real
//! WebSocket transport:
//! - Push channel connection lifecycle
//! - Push events flowing into the reconciled view
//! - Reconnection and shutdown

pub mod common;
