//! Integration test driver for the `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that exercises a group of modules
//! against the mock board. All tests run on the host with no real
//! hardware required.

mod calibration_tests;
mod host_tests;
mod mock_hw;
mod sensor_tests;
