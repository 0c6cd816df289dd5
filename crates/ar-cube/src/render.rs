//! What the rendering collaborator must draw.
//!
//! The core never opens a window. It produces a [`SceneDescription`] once per
//! run; a [`SceneRenderer`] reads it (typically every frame) together with
//! the background texture. [`JsonReportRenderer`] is the bundled headless
//! implementation.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use image::{DynamicImage, RgbaImage};
use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};

use ar_cube_core::ViewMatrix;

/// Window width in screen pixels; the height follows the image aspect.
pub const WINDOW_WIDTH: u32 = 600;
/// Where the window is placed on screen.
pub const WINDOW_POSITION: (i32, i32) = (800, 400);
/// Screen units per image pixel for the background plane half-extents.
const BACKGROUND_PX_PER_UNIT: f64 = 200.0;
/// Background plane depth is `-width / BACKGROUND_DEPTH_DIVISOR`.
const BACKGROUND_DEPTH_DIVISOR: f64 = 150.0;

#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("failed to write scene report to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialise scene report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Symmetric perspective frustum, as set up by `gluPerspective`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Perspective {
    pub fovy_deg: f64,
    pub aspect: f64,
    pub near: f64,
    pub far: f64,
}

impl Perspective {
    pub fn matrix(&self) -> Matrix4<f64> {
        let f = 1.0 / (self.fovy_deg.to_radians() * 0.5).tan();
        let (n, fa) = (self.near, self.far);
        Matrix4::new(
            f / self.aspect, 0.0, 0.0, 0.0, //
            0.0, f, 0.0, 0.0, //
            0.0, 0.0, (fa + n) / (n - fa), 2.0 * fa * n / (n - fa), //
            0.0, 0.0, -1.0, 0.0,
        )
    }

    pub fn to_column_major(&self) -> [f64; 16] {
        let mut out = [0.0; 16];
        out.copy_from_slice(self.matrix().as_slice());
        out
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TexturedVertex {
    pub position: [f64; 3],
    pub tex_coord: [f64; 2],
}

const fn tv(tex_coord: [f64; 2], position: [f64; 3]) -> TexturedVertex {
    TexturedVertex {
        position,
        tex_coord,
    }
}

/// One quad of geometry, vertices in drawing order.
pub type Face = [TexturedVertex; 4];

/// Image-textured plane drawn behind everything with an identity model-view.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BackgroundPlane {
    pub half_width: f64,
    pub half_height: f64,
    /// Translation along Z applied before drawing.
    pub z: f64,
}

impl BackgroundPlane {
    pub fn vertices(&self) -> Face {
        let (w, h) = (self.half_width, self.half_height);
        [
            tv([0.0, 1.0], [-w, -h, 0.0]),
            tv([1.0, 1.0], [w, -h, 0.0]),
            tv([1.0, 0.0], [w, h, 0.0]),
            tv([0.0, 0.0], [-w, h, 0.0]),
        ]
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    /// `SRC_ALPHA, ONE` with depth testing off.
    #[default]
    Additive,
}

/// The textured cube, placed by loading `view` as the model-view matrix and
/// translating by `offset`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CubeDraw {
    pub view: ViewMatrix,
    pub offset: [f64; 3],
    pub half_size: f64,
    pub blend: BlendMode,
}

/// Everything a renderer needs for the whole run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneDescription {
    pub image_width: u32,
    pub image_height: u32,
    pub window_size: (u32, u32),
    pub window_position: (i32, i32),
    pub projection: Perspective,
    pub background: BackgroundPlane,
    /// `None` when no pose was recovered: draw the background only.
    pub cube: Option<CubeDraw>,
}

impl SceneDescription {
    pub fn for_image(width: u32, height: u32, view: Option<ViewMatrix>) -> Self {
        let (w, h) = (width as f64, height as f64);
        let window_h = if width == 0 {
            0
        } else {
            (WINDOW_WIDTH as f64 * h / w).round() as u32
        };
        Self {
            image_width: width,
            image_height: height,
            window_size: (WINDOW_WIDTH, window_h),
            window_position: WINDOW_POSITION,
            projection: Perspective {
                fovy_deg: 45.0,
                aspect: if height == 0 { 1.0 } else { w / h },
                near: 0.1,
                far: 100.0,
            },
            background: BackgroundPlane {
                half_width: w / BACKGROUND_PX_PER_UNIT,
                half_height: h / BACKGROUND_PX_PER_UNIT,
                z: -w / BACKGROUND_DEPTH_DIVISOR,
            },
            cube: view.map(|view| CubeDraw {
                view,
                offset: [0.0, 0.0, 1.0],
                half_size: 1.0,
                blend: BlendMode::Additive,
            }),
        }
    }

    pub fn has_cube(&self) -> bool {
        self.cube.is_some()
    }
}

/// The six faces of the unit cube (half-size 1), 24 textured vertices.
pub fn cube_faces() -> [Face; 6] {
    [
        // front (z = +1)
        [
            tv([0.0, 0.0], [-1.0, -1.0, 1.0]),
            tv([1.0, 0.0], [1.0, -1.0, 1.0]),
            tv([1.0, 1.0], [1.0, 1.0, 1.0]),
            tv([0.0, 1.0], [-1.0, 1.0, 1.0]),
        ],
        // back (z = -1)
        [
            tv([1.0, 0.0], [-1.0, -1.0, -1.0]),
            tv([1.0, 1.0], [-1.0, 1.0, -1.0]),
            tv([0.0, 1.0], [1.0, 1.0, -1.0]),
            tv([0.0, 0.0], [1.0, -1.0, -1.0]),
        ],
        // top (y = +1)
        [
            tv([0.0, 1.0], [-1.0, 1.0, -1.0]),
            tv([0.0, 0.0], [-1.0, 1.0, 1.0]),
            tv([1.0, 0.0], [1.0, 1.0, 1.0]),
            tv([1.0, 1.0], [1.0, 1.0, -1.0]),
        ],
        // bottom (y = -1)
        [
            tv([1.0, 1.0], [-1.0, -1.0, -1.0]),
            tv([0.0, 1.0], [1.0, -1.0, -1.0]),
            tv([0.0, 0.0], [1.0, -1.0, 1.0]),
            tv([1.0, 0.0], [-1.0, -1.0, 1.0]),
        ],
        // right (x = +1)
        [
            tv([1.0, 0.0], [1.0, -1.0, -1.0]),
            tv([1.0, 1.0], [1.0, 1.0, -1.0]),
            tv([0.0, 1.0], [1.0, 1.0, 1.0]),
            tv([0.0, 0.0], [1.0, -1.0, 1.0]),
        ],
        // left (x = -1)
        [
            tv([0.0, 0.0], [-1.0, -1.0, -1.0]),
            tv([1.0, 0.0], [-1.0, -1.0, 1.0]),
            tv([1.0, 1.0], [-1.0, 1.0, 1.0]),
            tv([0.0, 1.0], [-1.0, 1.0, -1.0]),
        ],
    ]
}

/// Background pixels in upload order: RGBA, top row of the photograph
/// first, so texture row 0 lands on the plane's top edge (`t = 0` in
/// [`BackgroundPlane::vertices`]).
pub fn background_texture(img: &DynamicImage) -> RgbaImage {
    img.to_rgba8()
}

/// Draws a scene. Implementations own their window or output.
pub trait SceneRenderer {
    fn render(&mut self, scene: &SceneDescription, background: &RgbaImage)
        -> Result<(), RenderError>;
}

/// Headless renderer that writes the scene (and any attached report data)
/// as pretty JSON.
#[derive(Debug, Default)]
pub struct JsonReportRenderer {
    output: Option<PathBuf>,
    report: serde_json::Map<String, serde_json::Value>,
}

impl JsonReportRenderer {
    /// `None` writes to stdout.
    pub fn new(output: Option<PathBuf>) -> Self {
        Self {
            output,
            report: serde_json::Map::new(),
        }
    }

    /// Attach an extra top-level field to the written document.
    pub fn attach<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), RenderError> {
        self.report
            .insert(key.to_string(), serde_json::to_value(value)?);
        Ok(())
    }

    pub fn document(
        &self,
        scene: &SceneDescription,
        background: &RgbaImage,
    ) -> Result<serde_json::Value, RenderError> {
        let mut doc = self.report.clone();
        doc.insert("scene".into(), serde_json::to_value(scene)?);
        doc.insert(
            "view_matrix_column_major".into(),
            serde_json::to_value(scene.cube.map(|c| c.view.to_column_major()))?,
        );
        doc.insert(
            "projection_column_major".into(),
            serde_json::to_value(scene.projection.to_column_major())?,
        );
        doc.insert(
            "background_texture_size".into(),
            serde_json::to_value([background.width(), background.height()])?,
        );
        Ok(serde_json::Value::Object(doc))
    }
}

impl SceneRenderer for JsonReportRenderer {
    fn render(
        &mut self,
        scene: &SceneDescription,
        background: &RgbaImage,
    ) -> Result<(), RenderError> {
        let doc = self.document(scene, background)?;
        let text = serde_json::to_string_pretty(&doc)?;
        match &self.output {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent).map_err(|source| RenderError::Io {
                        path: parent.to_path_buf(),
                        source,
                    })?;
                }
                fs::write(path, text).map_err(|source| RenderError::Io {
                    path: path.clone(),
                    source,
                })?;
                log::info!("scene report written to {}", path.display());
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                writeln!(stdout, "{text}").map_err(|source| RenderError::Io {
                    path: PathBuf::from("<stdout>"),
                    source,
                })?;
            }
        }
        Ok(())
    }
}
