pub mod backup;
pub mod preflight;
pub mod report;
pub mod search;
