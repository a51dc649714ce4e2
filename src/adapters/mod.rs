//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter       | Implements              | Connects to                  |
//! |---------------|-------------------------|------------------------------|
//! | `channel`     | Transport               | In-process mpsc ring         |
//! | `config_file` | ConfigPort              | JSON file on disk            |
//! | `hardware`    | SensorPort              | Fixed bench readings         |
//! |               | ActuatorPort            | Recorded, logged actuation   |
//! | `log_sink`    | EventSink               | `log` facade / stderr        |
//! | `pwm`         | ActuatorPort            | embedded-hal PWM channels    |
//! | `serial`      | Transport               | UART via serial2             |
//! | `time`        | ClockPort               | Monotonic or manual clock    |

pub mod channel;
pub mod config_file;
pub mod hardware;
pub mod log_sink;
pub mod pwm;
pub mod serial;
pub mod time;
