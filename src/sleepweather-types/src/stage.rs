use std::fmt;

use serde::{Deserialize, Serialize};

/// Sleep level as reported by the wearable's `activityLevel` code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(into = "f64", try_from = "f64")]
pub enum SleepStage {
    Deep,
    #[default]
    Light,
    Rem,
    Awake,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvalidStageCode(pub f64);

impl fmt::Display for InvalidStageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid sleep stage code: {}", self.0)
    }
}

impl std::error::Error for InvalidStageCode {}

impl SleepStage {
    /// Stage assumed before the first observed level of the night.
    pub const PLACEHOLDER: SleepStage = SleepStage::Light;

    pub fn code(self) -> f64 {
        match self {
            SleepStage::Deep => 0.0,
            SleepStage::Light => 1.0,
            SleepStage::Rem => 2.0,
            SleepStage::Awake => 3.0,
        }
    }
}

impl TryFrom<f64> for SleepStage {
    type Error = InvalidStageCode;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if value.fract() != 0.0 {
            return Err(InvalidStageCode(value));
        }

        match value as i64 {
            0 => Ok(SleepStage::Deep),
            1 => Ok(SleepStage::Light),
            2 => Ok(SleepStage::Rem),
            3 => Ok(SleepStage::Awake),
            _ => Err(InvalidStageCode(value)),
        }
    }
}

impl From<SleepStage> for f64 {
    fn from(stage: SleepStage) -> Self {
        stage.code()
    }
}

impl fmt::Display for SleepStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SleepStage::Deep => "Deep",
            SleepStage::Light => "Light",
            SleepStage::Rem => "REM",
            SleepStage::Awake => "Awake",
        };
        f.write_str(name)
    }
}
