use anyhow::{anyhow, Context};
use image::{Rgb, RgbImage};
use imageproc::{
    drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut},
    rect::Rect,
};
use log::*;
use pcb_inspect::{DefectRecord, InspectConfig, InspectError, InspectionResult};
use rusttype::{Font, Scale};
use serde::Serialize;
use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
    str::FromStr,
};

const RED: Rgb<u8> = Rgb([255, 0, 0]);
const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
const BANNER_HEIGHT: u32 = 8;

/// Image dimensions given as `WIDTHxHEIGHT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl FromStr for Size {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let (width, height) = s
            .split_once(|c| c == 'x' || c == 'X')
            .ok_or_else(|| anyhow!("expected WIDTHxHEIGHT, got {:?}", s))?;
        let size = Size {
            width: width.trim().parse()?,
            height: height.trim().parse()?,
        };
        if size.width == 0 || size.height == 0 {
            return Err(anyhow!("size must not be empty"));
        }
        Ok(size)
    }
}

/// Reads the settings file, falling back to the defaults if it is missing or
/// cannot be parsed.
pub fn load_config(path: &Path) -> InspectConfig {
    let config = File::open(path)
        .ok()
        .and_then(|file| serde_json::from_reader(file).ok());
    if config.is_some() {
        info!("loaded settings from {}", path.display());
    } else {
        info!("used default settings");
    }
    config.unwrap_or_default()
}

pub fn load_font(path: &Path) -> anyhow::Result<Font<'static>> {
    let bytes = std::fs::read(path).with_context(|| format!("reading font {}", path.display()))?;
    Font::try_from_vec(bytes).ok_or_else(|| anyhow!("{} is not a usable font", path.display()))
}

/// The `test_*.png` files of a dataset directory, sorted by name.
pub fn dataset_images(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths = vec![];
    for entry in std::fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let path = entry?.path();
        let is_test_image = path
            .file_name()
            .and_then(|name| name.to_str())
            .map_or(false, |name| name.starts_with("test_") && name.ends_with(".png"));
        if is_test_image && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Draws the defects and the verdict over the aligned image.
///
/// Labels are only drawn when a font is available.
pub fn render_result(result: &InspectionResult, font: Option<&Font>) -> RgbImage {
    let mut canvas = result.aligned.image().clone();
    let (width, height) = canvas.dimensions();
    for defect in &result.defects {
        let b = defect.bbox;
        for inset in 0..2 {
            let rect = Rect::at(b.x as i32 - inset, b.y as i32 - inset)
                .of_size(b.width + 2 * inset as u32, b.height + 2 * inset as u32);
            draw_hollow_rect_mut(&mut canvas, rect, RED);
        }
        if let Some(font) = font {
            let label = format!("{} ({:.2})", defect.kind, defect.confidence);
            draw_text_mut(&mut canvas, RED, b.x as i32, b.y as i32 - 16, Scale::uniform(14.0), font, &label);
        }
    }
    let (status, color) = if result.passed() {
        ("PASS", GREEN)
    } else {
        ("FAIL", RED)
    };
    draw_filled_rect_mut(
        &mut canvas,
        Rect::at(0, 0).of_size(width, BANNER_HEIGHT.min(height)),
        color,
    );
    if let Some(font) = font {
        draw_text_mut(&mut canvas, color, 50, 20, Scale::uniform(48.0), font, status);
    }
    canvas
}

/// One line of `report.json`.
#[derive(Debug, Clone, Serialize)]
pub struct ImageReport {
    pub image: String,
    pub passed: bool,
    pub defects: Vec<DefectRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ImageReport {
    pub fn new(path: &Path, result: &Result<InspectionResult, InspectError>) -> Self {
        let image = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        match result {
            Ok(result) => Self {
                image,
                passed: result.passed(),
                defects: result.records(),
                error: None,
            },
            Err(e) => Self {
                image,
                passed: false,
                defects: vec![],
                error: Some(e.to_string()),
            },
        }
    }
}

pub fn write_report(path: &Path, reports: &[ImageReport]) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), reports)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sizes() {
        assert_eq!(
            "640x480".parse::<Size>().unwrap(),
            Size {
                width: 640,
                height: 480
            }
        );
        assert!("640".parse::<Size>().is_err());
        assert!("0x10".parse::<Size>().is_err());
        assert!("ax10".parse::<Size>().is_err());
    }

    #[test]
    fn lists_only_test_pngs_in_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["test_b.png", "test_a.png", "golden_master.png", "test_c.jpg", "notes.txt"] {
            File::create(dir.path().join(name)).unwrap();
        }
        let names: Vec<_> = dataset_images(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["test_a.png", "test_b.png"]);
    }

    #[test]
    fn missing_config_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_config(&dir.path().join("none.json")), InspectConfig::default());
        let path = dir.path().join("cfg.json");
        std::fs::write(&path, r#"{ "min_region_area": 250 }"#).unwrap();
        assert_eq!(load_config(&path).min_region_area, 250);
    }

    #[test]
    fn boxes_and_banner_are_drawn() {
        use pcb_inspect::{AlignedImage, BoundingBox, DefectKind, DefectRegion, Homography};

        let image = RgbImage::from_pixel(64, 48, Rgb([25, 50, 20]));
        let bbox = BoundingBox::new(20, 20, 10, 10);
        let mut result = InspectionResult {
            aligned: AlignedImage::fully_covered(image),
            transform: Homography::identity(),
            defects: vec![DefectRegion {
                bbox,
                area: 100.0,
                center: bbox.center(),
                centroid: (24.5, 24.5),
                kind: DefectKind::Defect,
                confidence: 0.5,
            }],
            matches: 10,
            inliers: 10,
        };
        let canvas = render_result(&result, None);
        assert_eq!(canvas.get_pixel(20, 25), &RED);
        assert_eq!(canvas.get_pixel(19, 25), &RED);
        assert_eq!(canvas.get_pixel(25, 25), &Rgb([25, 50, 20]));
        assert_eq!(canvas.get_pixel(5, 2), &RED);

        result.defects.clear();
        assert_eq!(render_result(&result, None).get_pixel(5, 2), &GREEN);
    }

    #[test]
    fn failed_image_reports_error() {
        let result = Err(InspectError::Alignment(
            pcb_inspect::AlignmentFailure::InsufficientMatches { found: 2 },
        ));
        let report = ImageReport::new(Path::new("dataset/test_blank.png"), &result);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["image"], "test_blank.png");
        assert_eq!(json["passed"], false);
        assert!(json["error"].as_str().unwrap().contains("only 2 matches"));
    }
}
