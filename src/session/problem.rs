//! Problems and the host-side collaborators a session talks to

use crate::config::EngineConfig;
use crate::recorder::RecordingResult;
use crate::render::{masked_background, MaskRect, ProblemSurfaces, Rgba, Surface};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One problem of an assignment, in presentation order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    pub id: String,

    /// Regions of the artwork hidden from the student
    #[serde(default)]
    pub masks: Vec<MaskRect>,
}

impl Problem {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            masks: Vec::new(),
        }
    }
}

/// Supplies the drawable layers of a problem canvas
pub trait SurfaceProvider: Send + Sync {
    fn surfaces(&self, problem: &Problem) -> ProblemSurfaces;
}

/// Plain canvas of a fixed size: solid artwork with the problem's masks baked
/// in and an empty ink layer.
pub struct BlankCanvas {
    pub width: u32,
    pub height: u32,
    pub paper: Rgba,
    pub mask_color: Rgba,
}

impl BlankCanvas {
    /// White paper, masks in the configured color
    pub fn from_config(width: u32, height: u32, config: &EngineConfig) -> Self {
        Self {
            width,
            height,
            paper: [255, 255, 255, 255],
            mask_color: config.mask_color,
        }
    }
}

impl SurfaceProvider for BlankCanvas {
    fn surfaces(&self, problem: &Problem) -> ProblemSurfaces {
        let artwork = Surface::filled(self.width, self.height, self.paper);
        ProblemSurfaces::new(
            masked_background(artwork, &problem.masks, self.mask_color),
            Surface::new(self.width, self.height),
        )
    }
}

/// Asks the student whether a stored recording may be discarded
#[async_trait]
pub trait OverwritePrompt: Send + Sync {
    async fn confirm_overwrite(&self, problem: &Problem, existing: &RecordingResult) -> bool;
}

/// Prompt that always answers the same way
pub struct FixedAnswer(pub bool);

#[async_trait]
impl OverwritePrompt for FixedAnswer {
    async fn confirm_overwrite(&self, problem: &Problem, _existing: &RecordingResult) -> bool {
        tracing::debug!("Overwrite of problem {} answered {}", problem.id, self.0);
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_canvas_bakes_masks() {
        let config = EngineConfig {
            mask_color: [10, 20, 30, 255],
            ..EngineConfig::default()
        };
        let canvas = BlankCanvas::from_config(4, 4, &config);
        let problem = Problem {
            id: "p1".to_string(),
            masks: vec![MaskRect {
                x: 0,
                y: 0,
                width: 2,
                height: 2,
            }],
        };

        let surfaces = canvas.surfaces(&problem);
        assert!(surfaces.is_ready());
        assert_eq!(surfaces.background.read().pixel(1, 1), Some([10, 20, 30, 255]));
        assert_eq!(surfaces.background.read().pixel(3, 3), Some([255, 255, 255, 255]));
        assert_eq!(surfaces.ink.read().pixel(0, 0), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_problem_masks_default_to_empty() {
        let problem: Problem = serde_json::from_str(r#"{"id":"p7"}"#).unwrap();
        assert_eq!(problem, Problem::new("p7"));
    }
}
