pub mod stale_reaper;

pub use stale_reaper::StaleJobReaper;
