//! Export engine: history item -> layout -> bitmap -> save dialog

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use qsolver_core::{EventBus, History, HistoryItem, NotificationLevel};
use qsolver_wire::Backend;
use tracing::{debug, error, info};

use crate::error::Result;
use crate::html::to_html;
use crate::layout::{ExportOptions, Layout, build_layout};
use crate::markdown::render_markdown;
use crate::raster::{Bitmap, CaptureOptions, MountedSurface, Rasterizer};

/// How an export request ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// Nothing to export at that index
    Skipped,
    /// The image was written
    Saved,
    /// The user dismissed the save dialog
    Cancelled,
    /// Rendering or saving failed
    Failed(String),
}

pub struct ExportEngine {
    rasterizer: Arc<dyn Rasterizer>,
    backend: Arc<dyn Backend>,
    events: EventBus,
    options: ExportOptions,
    date: Option<NaiveDate>,
}

impl ExportEngine {
    pub fn new(rasterizer: Arc<dyn Rasterizer>, backend: Arc<dyn Backend>, events: EventBus) -> Self {
        Self {
            rasterizer,
            backend,
            events,
            options: ExportOptions::default(),
            date: None,
        }
    }

    pub fn with_options(mut self, options: ExportOptions) -> Self {
        self.options = options;
        self
    }

    /// Pin the footer date instead of using today's
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Document tree for an item
    pub fn layout(&self, item: &HistoryItem) -> Layout {
        let date = self.date.unwrap_or_else(|| Local::now().date_naive());
        build_layout(item, &self.options, date, render_markdown)
    }

    /// Standalone HTML page for an item
    pub fn document(&self, item: &HistoryItem) -> String {
        to_html(&self.layout(item))
    }

    /// Render an item to a bitmap; the surface is unmounted on every path
    pub async fn render(&self, item: &HistoryItem) -> Result<Bitmap> {
        let layout = self.layout(item);
        let surface = MountedSurface::mount(self.rasterizer.as_ref(), &layout).await?;
        surface.capture(&CaptureOptions::for_layout(&layout)).await
    }

    /// Export the item at `index` and hand it to the backend's save dialog.
    ///
    /// Never mutates `history`. Failures are logged and reported as a
    /// notification.
    pub async fn export(&self, history: &History, index: usize) -> ExportOutcome {
        let Some(item) = history.get(index) else {
            debug!(index, len = history.len(), "Export skipped: no such history item");
            return ExportOutcome::Skipped;
        };
        if item.rounds().is_empty() {
            debug!(index, "Export skipped: item has no rounds");
            return ExportOutcome::Skipped;
        }

        match self.render_and_save(item).await {
            Ok(true) => {
                info!(index, id = %item.id, "Exported history item");
                ExportOutcome::Saved
            }
            Ok(false) => {
                info!(index, "Export cancelled by user");
                ExportOutcome::Cancelled
            }
            Err(e) => {
                error!(index, error = %e, "Export failed");
                self.events
                    .notify(NotificationLevel::Error, format!("Failed to export image: {e}"));
                ExportOutcome::Failed(e.to_string())
            }
        }
    }

    async fn render_and_save(&self, item: &HistoryItem) -> Result<bool> {
        let bitmap = self.render(item).await?;
        debug!(width = bitmap.width(), height = bitmap.height(), "Captured export bitmap");
        Ok(self.backend.save_image(&bitmap.to_data_url()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::raster::SurfaceId;
    use async_trait::async_trait;
    use image::ImageFormat;
    use parking_lot::Mutex;
    use qsolver_core::{SolutionEvent, StreamRouter};
    use qsolver_wire::{Settings, StreamEvent};
    use std::io::Cursor;

    #[derive(Default)]
    struct MockRasterizer {
        fail_capture: bool,
        mounts: Mutex<Vec<Layout>>,
        unmounts: Mutex<Vec<SurfaceId>>,
        captures: Mutex<usize>,
    }

    fn tiny_png() -> Vec<u8> {
        let image = image::RgbaImage::new(4, 4);
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    #[async_trait]
    impl Rasterizer for MockRasterizer {
        async fn mount(&self, layout: &Layout) -> Result<SurfaceId> {
            let mut mounts = self.mounts.lock();
            mounts.push(layout.clone());
            Ok(SurfaceId(mounts.len() as u64))
        }

        async fn capture(&self, _surface: SurfaceId, _options: &CaptureOptions) -> Result<Bitmap> {
            *self.captures.lock() += 1;
            if self.fail_capture {
                return Err(Error::Raster("canvas exploded".into()));
            }
            Bitmap::from_png(tiny_png())
        }

        fn unmount(&self, surface: SurfaceId) {
            self.unmounts.lock().push(surface);
        }
    }

    struct SaveBackend {
        answer: qsolver_wire::Result<bool>,
        saved: Mutex<Vec<String>>,
    }

    impl SaveBackend {
        fn answering(answer: qsolver_wire::Result<bool>) -> Self {
            Self {
                answer,
                saved: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Backend for SaveBackend {
        async fn get_settings(&self) -> qsolver_wire::Result<Settings> {
            Ok(Settings::default())
        }

        async fn sync_settings(&self, _json: &str) -> qsolver_wire::Result<()> {
            Ok(())
        }

        async fn get_models(&self, _api_key: &str, _base_url: &str) -> qsolver_wire::Result<Vec<String>> {
            Ok(Vec::new())
        }

        async fn test_connection(&self, _api_key: &str, _base_url: &str, _model: &str) -> qsolver_wire::Result<()> {
            Ok(())
        }

        async fn save_image(&self, data_url: &str) -> qsolver_wire::Result<bool> {
            self.saved.lock().push(data_url.to_string());
            match &self.answer {
                Ok(answer) => Ok(*answer),
                Err(e) => Err(qsolver_wire::Error::Backend(e.to_string())),
            }
        }
    }

    fn history_with_rounds() -> History {
        let mut router = StreamRouter::new();
        router.set_keep_context(true);
        for text in ["first", "second"] {
            router.handle(StreamEvent::StreamStart);
            router.handle(StreamEvent::Content { delta: text.into() });
            router.handle(StreamEvent::Solution { text: text.into() });
        }
        router.history().clone()
    }

    fn engine(rasterizer: Arc<MockRasterizer>, backend: Arc<SaveBackend>) -> (ExportEngine, EventBus) {
        let events = EventBus::new();
        let engine = ExportEngine::new(rasterizer, backend, events.clone())
            .with_date(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
        (engine, events)
    }

    #[tokio::test]
    async fn test_out_of_range_mounts_nothing() {
        let rasterizer = Arc::new(MockRasterizer::default());
        let backend = Arc::new(SaveBackend::answering(Ok(true)));
        let (engine, _) = engine(rasterizer.clone(), backend.clone());

        let history = history_with_rounds();
        assert_eq!(engine.export(&history, 5).await, ExportOutcome::Skipped);
        assert_eq!(engine.export(&History::new(), 0).await, ExportOutcome::Skipped);

        assert!(rasterizer.mounts.lock().is_empty());
        assert_eq!(*rasterizer.captures.lock(), 0);
        assert!(backend.saved.lock().is_empty());
    }

    #[tokio::test]
    async fn test_export_saves_png_data_url() {
        let rasterizer = Arc::new(MockRasterizer::default());
        let backend = Arc::new(SaveBackend::answering(Ok(true)));
        let (engine, _) = engine(rasterizer.clone(), backend.clone());

        let history = history_with_rounds();
        assert_eq!(engine.export(&history, 0).await, ExportOutcome::Saved);

        let mounts = rasterizer.mounts.lock();
        assert_eq!(mounts.len(), 1);
        assert_eq!(mounts[0].cards.len(), 2);
        assert_eq!(mounts[0].header.as_ref().unwrap().text, "2 rounds");
        assert_eq!(mounts[0].footer.date, "June 1, 2025");
        assert_eq!(*rasterizer.unmounts.lock(), vec![SurfaceId(1)]);

        let saved = backend.saved.lock();
        assert!(saved[0].starts_with("data:image/png;base64,"));
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_save() {
        let rasterizer = Arc::new(MockRasterizer::default());
        let backend = Arc::new(SaveBackend::answering(Ok(false)));
        let (engine, events) = engine(rasterizer, backend);
        let mut rx = events.subscribe();

        let history = history_with_rounds();
        assert_eq!(engine.export(&history, 0).await, ExportOutcome::Cancelled);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_capture_failure_still_unmounts() {
        let rasterizer = Arc::new(MockRasterizer {
            fail_capture: true,
            ..Default::default()
        });
        let backend = Arc::new(SaveBackend::answering(Ok(true)));
        let (engine, events) = engine(rasterizer.clone(), backend.clone());
        let mut rx = events.subscribe();

        let history = history_with_rounds();
        let outcome = engine.export(&history, 0).await;
        assert!(matches!(outcome, ExportOutcome::Failed(ref m) if m.contains("canvas exploded")));

        assert_eq!(rasterizer.unmounts.lock().len(), 1);
        assert!(backend.saved.lock().is_empty());
        assert!(matches!(
            rx.try_recv().unwrap(),
            SolutionEvent::Notification {
                level: NotificationLevel::Error,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_save_failure_is_reported() {
        let rasterizer = Arc::new(MockRasterizer::default());
        let backend = Arc::new(SaveBackend::answering(Err(qsolver_wire::Error::Backend(
            "permission denied".into(),
        ))));
        let (engine, _) = engine(rasterizer.clone(), backend);

        let history = history_with_rounds();
        let outcome = engine.export(&history, 0).await;
        assert_eq!(outcome, ExportOutcome::Failed("permission denied".into()));
        assert_eq!(rasterizer.unmounts.lock().len(), 1);
    }

    #[test]
    fn test_document_renders_answers() {
        let rasterizer = Arc::new(MockRasterizer::default());
        let backend = Arc::new(SaveBackend::answering(Ok(true)));
        let (engine, _) = engine(rasterizer, backend);

        let history = history_with_rounds();
        let html = engine.document(history.get(0).unwrap());
        assert!(html.contains("<p>first</p>"));
        assert!(html.contains("<p>second</p>"));
    }
}
