#[macro_use]
extern crate serde;

mod error;
pub use error::CodecError;

mod helpers;

pub mod garmin;
pub use garmin::{RawSleep, SleepPayload};

pub mod open_meteo;
pub use open_meteo::{Cadence, ForecastResponse, WeatherObservations};
