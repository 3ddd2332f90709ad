use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum RunnerError {
    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Mapping not found: {0}")]
    MappingNotFound(i64),

    #[error("Backup run not found: {0}")]
    RunNotFound(i64),

    #[error("Project '{0}' has no mappings to process")]
    NoMappings(String),

    #[error("Target drive(s) not accessible: {}", format_paths(.0))]
    TargetDriveInaccessible(Vec<PathBuf>),

    #[error("{0}")]
    InvalidArgument(String),
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
