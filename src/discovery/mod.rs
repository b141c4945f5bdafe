//! Date-window filtering and availability classification of search results

pub mod filter;
pub mod sanitize;
pub mod window;

pub use filter::{Availability, DateAndAvailabilityFilter, PaperCandidate};
pub use sanitize::sanitize_title;
pub use window::DateWindow;
