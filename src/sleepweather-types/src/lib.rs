pub mod series;
pub use series::{Sample, Series};

mod stage;
pub use stage::{InvalidStageCode, SleepStage};

mod metric;
pub use metric::{Column, SleepMetric, WeatherMetric};

mod rows;
pub use rows::{CombinedRow, SleepRow, WeatherRow};

mod window;
pub use window::SleepWindow;
