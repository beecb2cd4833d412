// Star scoring core: pure functions that turn a day's logged action into a
// bounded star score, plus the star-value validator used by presentation code.

pub mod error;
pub mod measurement;
pub mod score;
pub mod stars;

pub use error::ScoreError;
pub use measurement::{ActionMeasurement, MeasurementModel};
pub use score::{score_exact, score_range, MAX_SCORE, TARGET_SCORE};
pub use stars::{validate_stars, validate_stars_value, StarInput, MAX_STARS};
