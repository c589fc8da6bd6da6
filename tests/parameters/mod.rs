//! Integration tests for the parameter system
//!
//! These tests verify that the parameter system behaves correctly in various scenarios.

// Ties between column densities and velocities
mod constraints_tests;

// Moving parameter sets in and out of the optimizer and JSON
mod parameters_tests;
