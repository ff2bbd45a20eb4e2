use serde::{Deserialize, Serialize};

/// Tuning for post-scan aggregation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Directories holding fewer direct files are not analysed.
    pub min_files: usize,
    /// Link every direct file to the detected entity.
    pub link_files: bool,
    /// Stored on each directory analysis row.
    pub detection_method: String,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            min_files: 1,
            link_files: true,
            detection_method: "title_parser".to_string(),
        }
    }
}
