#[macro_use]
extern crate log;

pub mod garmin;
pub use garmin::{Credentials, GarminClient, SessionStore};

pub mod weather;
pub use weather::{ResponseCache, RetryConfig, WeatherClient};

pub mod plots;

mod pipeline;
pub use pipeline::collect_night;
