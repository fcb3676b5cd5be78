mod body_metrics;
mod daily_metrics;
mod profile;
mod status;
mod units;

pub use body_metrics::BodyMetricEntry;
pub use daily_metrics::DailyMetricEntry;
pub use profile::{NotificationPreferences, ProfileSettings, UnitPreferences, UserProfile};
pub use status::RecordStatus;
pub use units::{BodyFatMethod, Gender, HeightUnit, WeightUnit};
