/// Interval counter.
pub mod clock;
/// Phase-checked driver over all intervals.
pub mod engine;
pub mod foreign;
pub mod params;
pub mod system;
