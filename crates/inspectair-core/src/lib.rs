//! Hardware-independent core library for the InspectAir air-quality monitor
//!
//! This crate contains the platform-agnostic data path of the device: the
//! moving-average filter that calms raw sensor readings for the display, the
//! minute-resolution 24 hour history with its bounded flash backup, and the
//! clock and key-value capabilities both of them are built on.
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both the
//! ESP32-S3 target and desktop hosts (for the simulator and tests).

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod app_state;
pub mod clock;
pub mod config;
pub mod filter;
pub mod metrics;
pub mod sensors;
pub mod storage;
