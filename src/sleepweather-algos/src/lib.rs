#[macro_use]
extern crate log;

mod error;
pub use error::AlignError;

pub(crate) mod interpolate;
pub use interpolate::{forward_fill, interpolate_at, interpolate_linear};

pub(crate) mod align;
pub use align::SleepAligner;

pub(crate) mod resample;
pub use resample::WeatherResampler;

pub(crate) mod combine;
pub use combine::{Combined, Combiner, CoverageReport};

pub(crate) mod correlation;
pub use correlation::CorrelationMatrix;

pub(crate) mod summary;
pub use summary::NightSummary;

pub mod helpers;

#[cfg(test)]
mod fixtures;
