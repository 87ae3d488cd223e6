use thiserror::Error;

/// Library error type for carousel operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Neither the description file nor the inline list produced a record.
    #[error(
        "no photos configured; provide images via \"description_file_path\" or \"photos\""
    )]
    NoPhotosConfigured,

    /// Sources produced records but the age/count filters removed all of them.
    #[error("all {total} configured photos were removed by the max_days_to_show filter")]
    AllPhotosFiltered { total: usize },

    /// Plain-text description files name bare filenames and need a folder.
    #[error("\"folder_path\" is required when a non-JSON description_file_path is used")]
    MissingFolderPath,

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Transport failure while fetching a remote description file.
    #[error("failed to fetch {location}: {source}")]
    Fetch {
        location: String,
        #[source]
        source: reqwest::Error,
    },

    /// The remote description file answered with a non-success status.
    #[error("failed to fetch {location}: HTTP {status}")]
    HttpStatus {
        location: String,
        status: reqwest::StatusCode,
    },

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Malformed JSON description file.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML/serde configuration error.
    #[error(transparent)]
    Config(#[from] serde_yaml::Error),
}

impl Error {
    /// Whether the error belongs to the configuration class that must reach
    /// the host instead of being absorbed by the source fallback chain.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::NoPhotosConfigured
                | Self::AllPhotosFiltered { .. }
                | Self::MissingFolderPath
                | Self::Config(_)
        )
    }
}
