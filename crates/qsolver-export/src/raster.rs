//! Rasterizer seam: layouts in, PNG bitmaps out

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use image::ImageFormat;
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::html::to_html;
use crate::layout::Layout;

/// Handle to an off-screen document owned by a rasterizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub u64);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a mounted surface is captured
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureOptions {
    /// Viewport width in CSS pixels
    pub width: u32,
    /// Device pixel ratio
    pub scale: f32,
}

impl CaptureOptions {
    pub fn for_layout(layout: &Layout) -> Self {
        Self {
            width: layout.outer_width(),
            scale: layout.scale,
        }
    }
}

/// A decoded-and-checked PNG image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    png: Vec<u8>,
    width: u32,
    height: u32,
}

impl Bitmap {
    /// Wrap PNG bytes, failing if they do not decode
    pub fn from_png(png: Vec<u8>) -> Result<Self> {
        let image = image::load_from_memory_with_format(&png, ImageFormat::Png)?;
        Ok(Self {
            width: image.width(),
            height: image.height(),
            png,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn png_bytes(&self) -> &[u8] {
        &self.png
    }

    /// `data:image/png;base64,` URL for the save dialog
    pub fn to_data_url(&self) -> String {
        qsolver_wire::encode_png_data_url(&self.png)
    }
}

/// Turns layouts into bitmaps.
///
/// A layout is first mounted as an off-screen surface, then captured, then
/// unmounted. Callers should hold a [`MountedSurface`] so the unmount happens
/// on every exit path.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    async fn mount(&self, layout: &Layout) -> Result<SurfaceId>;

    async fn capture(&self, surface: SurfaceId, options: &CaptureOptions) -> Result<Bitmap>;

    /// Remove a surface; unknown ids are ignored
    fn unmount(&self, surface: SurfaceId);
}

/// A mounted surface that is unmounted when dropped
pub struct MountedSurface<'a> {
    rasterizer: &'a dyn Rasterizer,
    id: SurfaceId,
}

impl<'a> MountedSurface<'a> {
    pub async fn mount(rasterizer: &'a dyn Rasterizer, layout: &Layout) -> Result<Self> {
        let id = rasterizer.mount(layout).await?;
        debug!(surface = %id, "Mounted export surface");
        Ok(Self { rasterizer, id })
    }

    pub fn id(&self) -> SurfaceId {
        self.id
    }

    pub async fn capture(&self, options: &CaptureOptions) -> Result<Bitmap> {
        self.rasterizer.capture(self.id, options).await
    }
}

impl Drop for MountedSurface<'_> {
    fn drop(&mut self) {
        self.rasterizer.unmount(self.id);
        debug!(surface = %self.id, "Unmounted export surface");
    }
}

/// Default external renderer
pub const DEFAULT_PROGRAM: &str = "wkhtmltoimage";

/// Default arguments for [`DEFAULT_PROGRAM`]
pub const DEFAULT_ARGS: &[&str] = &[
    "--quiet",
    "--format",
    "png",
    "--enable-local-file-access",
    "--width",
    "{width}",
    "--zoom",
    "{zoom}",
    "{input}",
    "{output}",
];

const DOCUMENT_FILE: &str = "export.html";
const CAPTURE_FILE: &str = "export.png";

/// Rasterizes by running an HTML-to-image program.
///
/// Mounting writes the HTML document into a private temporary directory,
/// which is deleted on unmount. Arguments may use the placeholders
/// `{input}`, `{output}`, `{width}` and `{zoom}`.
pub struct CommandRasterizer {
    program: String,
    args: Vec<String>,
    surfaces: Mutex<HashMap<SurfaceId, TempDir>>,
    next_id: AtomicU64,
}

impl CommandRasterizer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            surfaces: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Parse a whitespace-separated command line
    pub fn from_command_line(command: &str) -> Result<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| Error::Raster("empty rasterizer command".to_string()))?;
        Ok(Self::new(program, parts.collect()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Number of surfaces currently mounted
    pub fn mounted(&self) -> usize {
        self.surfaces.lock().len()
    }

    fn surface_dir(&self, surface: SurfaceId) -> Result<PathBuf> {
        self.surfaces
            .lock()
            .get(&surface)
            .map(|dir| dir.path().to_path_buf())
            .ok_or(Error::UnknownSurface(surface))
    }

    fn expand_args(&self, input: &str, output: &str, options: &CaptureOptions) -> Vec<String> {
        let width = options.width.to_string();
        let zoom = options.scale.to_string();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{input}", input)
                    .replace("{output}", output)
                    .replace("{width}", &width)
                    .replace("{zoom}", &zoom)
            })
            .collect()
    }
}

impl Default for CommandRasterizer {
    fn default() -> Self {
        Self::new(
            DEFAULT_PROGRAM,
            DEFAULT_ARGS.iter().map(|s| s.to_string()).collect(),
        )
    }
}

#[async_trait]
impl Rasterizer for CommandRasterizer {
    async fn mount(&self, layout: &Layout) -> Result<SurfaceId> {
        let dir = tempfile::Builder::new().prefix("qsolver-export-").tempdir()?;
        tokio::fs::write(dir.path().join(DOCUMENT_FILE), to_html(layout)).await?;

        let id = SurfaceId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.surfaces.lock().insert(id, dir);
        Ok(id)
    }

    async fn capture(&self, surface: SurfaceId, options: &CaptureOptions) -> Result<Bitmap> {
        let dir = self.surface_dir(surface)?;
        let input = dir.join(DOCUMENT_FILE);
        let output = dir.join(CAPTURE_FILE);
        let args = self.expand_args(
            &input.to_string_lossy(),
            &output.to_string_lossy(),
            options,
        );

        debug!(program = %self.program, ?args, "Running capture command");
        let result = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::Raster(format!("failed to run `{}`: {e}", self.program)))?;

        if !result.status.success() {
            return Err(Error::CommandFailed {
                command: self.program.clone(),
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        let png = tokio::fs::read(&output).await?;
        Bitmap::from_png(png)
    }

    fn unmount(&self, surface: SurfaceId) {
        let Some(dir) = self.surfaces.lock().remove(&surface) else {
            return;
        };
        if let Err(e) = dir.close() {
            warn!(surface = %surface, error = %e, "Failed to remove export surface");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{ExportOptions, build_layout};
    use chrono::NaiveDate;
    use qsolver_core::HistoryItem;
    use std::io::Cursor;

    fn layout() -> Layout {
        let item = HistoryItem::new("");
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        build_layout(&item, &ExportOptions::default(), date, |s| s.to_string())
    }

    fn tiny_png() -> Vec<u8> {
        let image = image::RgbaImage::from_pixel(3, 2, image::Rgba([255, 0, 0, 255]));
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    #[test]
    fn test_bitmap_validates_png() {
        let bitmap = Bitmap::from_png(tiny_png()).unwrap();
        assert_eq!((bitmap.width(), bitmap.height()), (3, 2));
        assert!(bitmap.to_data_url().starts_with("data:image/png;base64,"));

        assert!(Bitmap::from_png(b"not a png".to_vec()).is_err());
    }

    #[test]
    fn test_expand_placeholders() {
        let rasterizer = CommandRasterizer::default();
        let options = CaptureOptions { width: 956, scale: 2.0 };
        let args = rasterizer.expand_args("/tmp/in.html", "/tmp/out.png", &options);
        assert!(args.windows(2).any(|w| w == ["--width", "956"]));
        assert!(args.windows(2).any(|w| w == ["--zoom", "2"]));
        assert_eq!(&args[args.len() - 2..], ["/tmp/in.html", "/tmp/out.png"]);
    }

    #[test]
    fn test_from_command_line() {
        let rasterizer = CommandRasterizer::from_command_line("chromium --headless {input}").unwrap();
        assert_eq!(rasterizer.program(), "chromium");
        assert!(CommandRasterizer::from_command_line("   ").is_err());
    }

    #[tokio::test]
    async fn test_mount_and_unmount_manage_directory() {
        let rasterizer = CommandRasterizer::default();
        let id = rasterizer.mount(&layout()).await.unwrap();
        let dir = rasterizer.surface_dir(id).unwrap();

        let html = std::fs::read_to_string(dir.join(DOCUMENT_FILE)).unwrap();
        assert!(html.contains("Question 1"));

        rasterizer.unmount(id);
        assert!(!dir.exists());
        assert_eq!(rasterizer.mounted(), 0);
        assert!(matches!(
            rasterizer.surface_dir(id),
            Err(Error::UnknownSurface(_))
        ));
    }

    #[tokio::test]
    async fn test_guard_unmounts_on_drop() {
        let rasterizer = CommandRasterizer::default();
        {
            let surface = MountedSurface::mount(&rasterizer, &layout()).await.unwrap();
            assert_eq!(rasterizer.mounted(), 1);
            let _ = surface.id();
        }
        assert_eq!(rasterizer.mounted(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_capture_runs_command() {
        let source = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(source.path(), tiny_png()).unwrap();

        let rasterizer = CommandRasterizer::new(
            "cp",
            vec![source.path().to_string_lossy().into_owned(), "{output}".into()],
        );
        let surface = MountedSurface::mount(&rasterizer, &layout()).await.unwrap();
        let bitmap = surface
            .capture(&CaptureOptions { width: 956, scale: 2.0 })
            .await
            .unwrap();
        assert_eq!(bitmap.width(), 3);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_capture_reports_command_failure() {
        let rasterizer = CommandRasterizer::new("false", Vec::new());
        let surface = MountedSurface::mount(&rasterizer, &layout()).await.unwrap();
        let err = surface
            .capture(&CaptureOptions { width: 956, scale: 2.0 })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CommandFailed { .. }));
    }
}
