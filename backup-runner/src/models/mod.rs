pub mod backup_detail;
pub mod backup_history;
pub mod file_detail;
pub mod mapping;
pub mod project;
pub mod settings;

/// Timestamp format of every `*_date` column
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn now() -> String {
    chrono::Local::now().format(DATE_FORMAT).to_string()
}
