pub mod date;
pub mod fields;
pub mod json;
pub mod pipeline;
pub mod prompts;
pub mod time;

pub use date::normalize_date;
pub use fields::extract_fields;
pub use pipeline::ExperienceExtractor;
pub use time::normalize_time;
