//! Input series that do not come from the user: seeded synthetic WBC data.

pub mod sample;

pub use sample::{SampleData, generate_sample};
