//! JSON run configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use ar_cube_pose::{PoseSolverParams, SingleViewCalibrationParams};
use ar_cube_quad::QuadDetectorParams;

use crate::error::ArError;

/// Every knob of one run. All sections and fields are optional in JSON.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArConfig {
    pub detector: QuadDetectorParams,
    pub pose: PoseSolverParams,
    pub calibration: SingleViewCalibrationParams,
}

impl ArConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ArError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn load(path: &Path) -> Result<Self, ArError> {
        let raw = fs::read_to_string(path).map_err(|source| ArError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_all_defaults() {
        assert_eq!(ArConfig::from_json_str("{}").expect("parse"), ArConfig::default());
    }

    #[test]
    fn partial_sections_override_only_named_fields() {
        let cfg = ArConfig::from_json_str(
            r#"{
                "detector": { "canny_low": 50 },
                "pose": { "depth_offset": 11, "lm": { "max_iters": 5 } },
                "calibration": { "fallback_focal_px": 900 }
            }"#,
        )
        .expect("parse");
        assert_eq!(cfg.detector.canny_low, 50.0);
        assert_eq!(cfg.detector.canny_high, 200.0);
        assert_eq!(cfg.pose.depth_offset, 11.0);
        assert_eq!(cfg.pose.lm.max_iters, 5);
        assert_eq!(cfg.pose.lm.lambda_mul, 10.0);
        assert_eq!(cfg.calibration.fallback_focal_px, Some(900.0));
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = ArConfig::from_json_str("{ detector: ").unwrap_err();
        assert!(matches!(err, ArError::Config(_)));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = ArConfig::load(Path::new("/nonexistent/ar-cube.json")).unwrap_err();
        assert!(matches!(err, ArError::Io { .. }));
    }
}
