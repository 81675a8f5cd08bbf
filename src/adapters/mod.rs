//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter    | Implements | Connects to                      |
//! |------------|------------|----------------------------------|
//! | `hardware` | Board      | ESP32-S3 GPIO, ADC1, LEDC PWM    |
//! | `log_sink` | EventSink  | Serial log output                |
//! | `time`     | (clock)    | ESP32 high-resolution timer      |

pub mod hardware;
pub mod log_sink;
pub mod time;
