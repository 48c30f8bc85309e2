// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Edit session: one source image, its history, and the async entry points a
// front end calls.
//
// Pixel work runs on tokio's blocking pool so the caller's executor stays
// responsive. Every mutating method takes `&mut self` and holds it across the
// await, which serialises edits in the order they were issued. A failed
// operation returns its error and leaves the history exactly as it was.

use std::sync::Arc;
use std::time::Duration;

use retouch_core::error::{Result, RetouchError};
use retouch_core::{EngineConfig, Raster, RasterFormat};
use retouch_history::{HistoryEntry, HistoryStack};
use retouch_raster::{AsciiOptions, EditOp, ascii, codec};
use serde_json::{Map, Value, json};
use tokio::task;
use tracing::{info, instrument, warn};

use crate::gateway::{EnhancementGateway, RemoteOperation};
use crate::telemetry::{ActivitySink, TracingSink, fingerprint};

/// Run `job` on the blocking pool, mapping a panicked or cancelled worker to
/// `RetouchError::Task`.
pub(crate) async fn blocking<T, F>(job: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    task::spawn_blocking(job)
        .await
        .map_err(|err| RetouchError::Task(err.to_string()))?
}

/// How a recorded entry is reproduced by [`EditSession::replay`].
enum ReplayStep {
    /// A local edit, re-run from its settings.
    Local(EditOp),
    /// A remote result, carried over as recorded.
    Recorded {
        tool_id: String,
        tool_name: String,
        settings: Map<String, Value>,
        image: Arc<Raster>,
    },
}

/// An editing session over one source image.
pub struct EditSession {
    history: HistoryStack,
    config: EngineConfig,
    sink: Arc<dyn ActivitySink>,
    gateway: EnhancementGateway,
}

impl EditSession {
    // -- Construction -------------------------------------------------------

    /// Start a session on an already decoded raster with default settings,
    /// a `TracingSink`, and no remote providers.
    pub fn new(original: Raster) -> Self {
        Self {
            history: HistoryStack::new(original),
            config: EngineConfig::default(),
            sink: Arc::new(TracingSink),
            gateway: EnhancementGateway::new(),
        }
    }

    /// Decode `bytes` (declared as `mime_type`) off the async thread and start
    /// a session on the result.
    ///
    /// Inputs larger than `config.max_upload_bytes` are refused before
    /// decoding.
    #[instrument(skip(bytes, config), fields(data_len = bytes.len()))]
    pub async fn open(bytes: Vec<u8>, mime_type: &str, config: EngineConfig) -> Result<Self> {
        check_upload_size(bytes.len(), &config)?;
        let mime_type = mime_type.to_string();
        let original = blocking(move || codec::decode(&bytes, &mime_type)).await?;
        info!(
            width = original.width(),
            height = original.height(),
            format = %original.format(),
            "Session opened"
        );
        Ok(Self::new(original).with_config(config))
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ActivitySink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_gateway(mut self, gateway: EnhancementGateway) -> Self {
        self.gateway = gateway;
        self
    }

    /// Replace the source image, discarding the whole history.
    pub fn load(&mut self, original: Raster) {
        info!(
            width = original.width(),
            height = original.height(),
            discarded = self.history.len(),
            "Loading new source image"
        );
        self.history = HistoryStack::new(original);
    }

    // -- Accessors ----------------------------------------------------------

    pub fn history(&self) -> &HistoryStack {
        &self.history
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn current_image(&self) -> &Arc<Raster> {
        self.history.current_image()
    }

    // -- Edits --------------------------------------------------------------

    /// Apply `op` to the current image and append the result to the history.
    #[instrument(skip(self), fields(tool = op.tool_id()))]
    pub async fn apply(&mut self, op: EditOp) -> Result<&HistoryEntry> {
        let settings = op.settings()?;
        let current = Arc::clone(self.history.current_image());
        let worker_op = op.clone();
        let (result, digest) = blocking(move || {
            let result = worker_op.run(&current)?;
            let digest = match &result.output {
                retouch_core::FilterOutput::Raster(raster) => fingerprint(raster.samples()),
                retouch_core::FilterOutput::Text(text) => fingerprint(text.as_bytes()),
            };
            Ok((result, digest))
        })
        .await?;

        let elapsed = result.elapsed;
        let raster = result
            .into_raster()
            .ok_or_else(|| RetouchError::Task(format!("{} produced text, not an image", op.tool_id())))?;
        let (width, height) = raster.dimensions();

        self.history
            .commit(op.tool_id(), op.tool_name(), settings, raster);
        self.report(
            "edit",
            json!({
                "tool_id": op.tool_id(),
                "index": self.history.current_index(),
                "width": width,
                "height": height,
                "elapsed_ms": duration_ms(elapsed),
                "fingerprint": digest,
            }),
        );
        Ok(self.history.current_entry())
    }

    /// Apply each op in order, stopping at the first failure. Edits before
    /// the failure stay in the history.
    pub async fn apply_all(&mut self, ops: impl IntoIterator<Item = EditOp>) -> Result<()> {
        for op in ops {
            self.apply(op).await?;
        }
        Ok(())
    }

    /// Run a remote enhancement and append its result.
    ///
    /// When every provider fails, `Upscale` falls back to a local Lanczos
    /// resize; `FaceRestore` has no local equivalent and returns the error.
    #[instrument(skip(self))]
    pub async fn enhance_remote(&mut self, operation: RemoteOperation) -> Result<&HistoryEntry> {
        let current = Arc::clone(self.history.current_image());
        let outcome = self.gateway.enhance(Arc::clone(&current), operation).await;
        let (image, path) = match outcome {
            Ok(image) => (image, "remote"),
            Err(err) => match operation {
                RemoteOperation::Upscale { factor } => {
                    warn!(error = %err, factor, "Remote upscale unavailable, using local resize");
                    let op = local_upscale(&current, factor)?;
                    (blocking(move || op.apply(&current)).await?, "local")
                }
                RemoteOperation::FaceRestore => return Err(err),
            },
        };

        let mut settings = operation.params();
        settings.insert("operation".into(), json!(operation.tool_id()));
        settings.insert("path".into(), json!(path));
        let metadata = json!({
            "tool_id": operation.tool_id(),
            "path": path,
            "width": image.width(),
            "height": image.height(),
            "fingerprint": fingerprint(image.samples()),
        });

        self.history
            .commit(operation.tool_id(), operation.tool_name(), settings, image);
        self.report("enhance", metadata);
        Ok(self.history.current_entry())
    }

    // -- Navigation ---------------------------------------------------------

    pub fn undo(&mut self) -> bool {
        self.history.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.history.redo()
    }

    pub fn jump_to(&mut self, index: usize) -> Result<()> {
        self.history.jump_to(index)
    }

    /// Rebuild the history from the original by re-running every recorded
    /// edit up to the cursor. Entries ahead of the cursor are dropped.
    ///
    /// Remote results cannot be recomputed locally and are carried over as
    /// recorded. Jittered watercolor entries come out different.
    #[instrument(skip(self), fields(edits = self.history.edits().len()))]
    pub async fn replay(&mut self) -> Result<()> {
        let original = Arc::clone(self.history.original());
        let steps = self
            .history
            .edits()
            .iter()
            .map(replay_step)
            .collect::<Result<Vec<_>>>()?;

        let rebuilt = blocking(move || {
            let mut stack = HistoryStack::from_shared(original);
            for step in steps {
                match step {
                    ReplayStep::Local(op) => {
                        let settings = op.settings()?;
                        stack.apply(op.tool_id(), op.tool_name(), settings, |img| op.apply(img))?;
                    }
                    ReplayStep::Recorded {
                        tool_id,
                        tool_name,
                        settings,
                        image,
                    } => {
                        stack.commit(&tool_id, &tool_name, settings, image);
                    }
                }
            }
            Ok(stack)
        })
        .await?;

        info!(entries = rebuilt.len(), "History replayed");
        self.history = rebuilt;
        self.report(
            "replay",
            json!({
                "entries": self.history.len(),
                "fingerprint": fingerprint(self.history.current_image().samples()),
            }),
        );
        Ok(())
    }

    // -- Output -------------------------------------------------------------

    /// Render the current image as ASCII art. Not a history entry.
    pub async fn ascii(&self, options: AsciiOptions) -> Result<String> {
        let current = Arc::clone(self.history.current_image());
        blocking(move || ascii::render(&current, &options)).await
    }

    /// Encode the current image.
    pub async fn export(&self, format: RasterFormat, quality: u8) -> Result<Vec<u8>> {
        let current = Arc::clone(self.history.current_image());
        let bytes = blocking(move || codec::encode(&current, format, quality)).await?;
        self.report(
            "export",
            json!({ "format": format.extension(), "bytes": bytes.len() }),
        );
        Ok(bytes)
    }

    /// Encode the current image with the configured default format and quality.
    pub async fn export_default(&self) -> Result<Vec<u8>> {
        self.export(self.config.default_export_format, self.config.default_quality)
            .await
    }

    // -- Internal -----------------------------------------------------------

    /// Forward an event to the sink, logging and swallowing any failure.
    /// Runs inline; sinks queue rather than block (see [`ActivitySink`]).
    fn report(&self, event_type: &str, metadata: Value) {
        if let Err(err) = self.sink.record(event_type, metadata) {
            warn!(event = event_type, error = %err, "Activity sink rejected event");
        }
    }
}

/// Refuse inputs over the configured ceiling.
pub fn check_upload_size(len: usize, config: &EngineConfig) -> Result<()> {
    if len > config.max_upload_bytes {
        return Err(RetouchError::Range(format!(
            "input is {len} bytes, above the {} byte limit",
            config.max_upload_bytes
        )));
    }
    Ok(())
}

/// Local stand-in for a remote upscale.
fn local_upscale(raster: &Raster, factor: u32) -> Result<EditOp> {
    let scale = |v: u32| {
        v.checked_mul(factor)
            .filter(|_| factor > 0)
            .ok_or_else(|| RetouchError::Range(format!("cannot upscale {v} px by {factor}")))
    };
    Ok(EditOp::Resize {
        width: scale(raster.width())?,
        height: scale(raster.height())?,
        maintain_aspect: false,
    })
}

fn replay_step(entry: &HistoryEntry) -> Result<ReplayStep> {
    if let Ok(op) = EditOp::from_settings(&entry.settings) {
        return Ok(ReplayStep::Local(op));
    }
    let image = entry.image.clone().ok_or_else(|| {
        RetouchError::Settings(format!("entry {} has neither settings nor an image", entry.id))
    })?;
    Ok(ReplayStep::Recorded {
        tool_id: entry.tool_id.clone().unwrap_or_default(),
        tool_name: entry.tool_name.clone(),
        settings: entry.settings.clone(),
        image,
    })
}

fn duration_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{BoxFuture, EnhanceRequest, EnhanceResponse, EnhancementProvider, StubProvider};
    use crate::telemetry::{ChannelSink, MemorySink};
    use retouch_raster::ColorAdjustments;

    fn gradient() -> Raster {
        let samples: Vec<u8> = (0..12u32 * 8)
            .flat_map(|i| {
                let (x, y) = (i % 12, i / 12);
                [(x * 20) as u8, (y * 30) as u8, ((x + y) * 10) as u8, 255]
            })
            .collect();
        Raster::from_samples(12, 8, samples).unwrap()
    }

    fn session_with_log() -> (EditSession, MemorySink) {
        let log = MemorySink::new();
        let session = EditSession::new(gradient()).with_sink(Arc::new(log.clone()));
        (session, log)
    }

    struct FailingSink;

    impl ActivitySink for FailingSink {
        fn record(&self, _event_type: &str, _metadata: Value) -> Result<()> {
            Err(RetouchError::Remote("sink offline".into()))
        }
    }

    /// Always answers with a fixed 2x2 blue image.
    struct FixedImage;

    impl EnhancementProvider for FixedImage {
        fn name(&self) -> &str {
            "fixed"
        }

        fn enhance<'a>(&'a self, _request: &'a EnhanceRequest) -> BoxFuture<'a, Result<EnhanceResponse>> {
            Box::pin(async {
                let blue = Raster::filled(2, 2, [0, 0, 255, 255])?;
                let png = codec::encode(&blue, RasterFormat::Png, 100)?;
                Ok::<_, RetouchError>(EnhanceResponse::ok(png))
            })
        }
    }

    #[tokio::test]
    async fn open_decodes_and_enforces_the_size_ceiling() {
        let png = codec::encode(&gradient(), RasterFormat::Png, 100).unwrap();
        let session = EditSession::open(png.clone(), "image/png", EngineConfig::default())
            .await
            .unwrap();
        assert_eq!(session.current_image().dimensions(), (12, 8));
        assert_eq!(session.history().len(), 1);

        let tiny = EngineConfig {
            max_upload_bytes: 10,
            ..Default::default()
        };
        let err = EditSession::open(png, "image/png", tiny).await.err().unwrap();
        assert!(matches!(err, RetouchError::Range(_)));
    }

    #[tokio::test]
    async fn open_rejects_garbage() {
        let err = EditSession::open(b"definitely not a png".to_vec(), "image/png", EngineConfig::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, RetouchError::Decode(_)));
    }

    #[tokio::test]
    async fn edits_are_recorded_and_reported() {
        let (mut session, log) = session_with_log();
        session.apply(EditOp::Rotate { degrees: 90.0 }).await.unwrap();
        let entry = session.apply(EditOp::Sharpen).await.unwrap();
        assert_eq!(entry.tool_id.as_deref(), Some("sharpen"));

        assert_eq!(session.history().len(), 3);
        assert_eq!(session.current_image().dimensions(), (8, 12));

        let events = log.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].metadata["tool_id"], "sharpen");
        assert_eq!(
            events[1].metadata["fingerprint"],
            fingerprint(session.current_image().samples())
        );
    }

    #[tokio::test]
    async fn failed_edit_leaves_history_and_log_alone() {
        let (mut session, log) = session_with_log();
        session.apply(EditOp::Blur).await.unwrap();

        let err = session
            .apply(EditOp::Crop {
                x: 10,
                y: 0,
                width: 5,
                height: 5,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RetouchError::Range(_)));
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.history().current_index(), 1);
        assert_eq!(log.events().len(), 1);
    }

    #[tokio::test]
    async fn sink_failures_do_not_fail_the_edit() {
        let mut session = EditSession::new(gradient()).with_sink(Arc::new(FailingSink));
        assert!(session.apply(EditOp::Denoise).await.is_ok());
        assert_eq!(session.history().len(), 2);
    }

    #[tokio::test]
    async fn channel_sink_delivers_on_a_separate_task() {
        let (sink, mut receiver) = ChannelSink::new();
        let drain = tokio::spawn(async move {
            let mut seen = Vec::new();
            while let Some(event) = receiver.recv().await {
                seen.push(event.event_type);
            }
            seen
        });

        let mut session = EditSession::new(gradient()).with_sink(Arc::new(sink));
        session.apply(EditOp::Blur).await.unwrap();
        session.export(RasterFormat::Png, 90).await.unwrap();
        drop(session);

        assert_eq!(drain.await.unwrap(), ["edit", "export"]);
    }

    #[tokio::test]
    async fn undo_all_then_export_matches_the_original() {
        let (mut session, _) = session_with_log();
        session
            .apply_all([
                EditOp::AutoEnhance,
                EditOp::Adjust(ColorAdjustments {
                    brightness: 1.2,
                    ..Default::default()
                }),
                EditOp::Flip {
                    horizontal: false,
                    vertical: true,
                },
            ])
            .await
            .unwrap();
        while session.undo() {}

        let exported = session.export(RasterFormat::Png, 100).await.unwrap();
        let back = codec::decode(&exported, "image/png").unwrap();
        assert_eq!(back.samples(), gradient().samples());
    }

    #[tokio::test]
    async fn replay_reproduces_deterministic_chains() {
        let (mut session, log) = session_with_log();
        session
            .apply_all([
                EditOp::Rotate { degrees: 180.0 },
                EditOp::Cartoon,
                EditOp::EdgeDetect,
            ])
            .await
            .unwrap();
        session.undo();
        let before = Arc::clone(session.current_image());
        let ids: Vec<_> = session.history().entries().iter().map(|e| e.id).collect();

        session.replay().await.unwrap();
        assert_eq!(session.history().len(), 3);
        assert!(!session.history().can_redo());
        assert_eq!(session.current_image().samples(), before.samples());
        assert_ne!(session.history().entries()[1].id, ids[1]);
        assert_eq!(log.events().last().unwrap().event_type, "replay");
    }

    #[tokio::test]
    async fn upscale_falls_back_to_local_resize() {
        let (session, log) = session_with_log();
        let mut session = session.with_gateway(EnhancementGateway::new().with_provider(StubProvider));
        let entry = session
            .enhance_remote(RemoteOperation::Upscale { factor: 2 })
            .await
            .unwrap();
        assert_eq!(entry.tool_id.as_deref(), Some("upscale"));
        assert_eq!(entry.settings["path"], "local");
        assert_eq!(session.current_image().dimensions(), (24, 16));
        assert_eq!(log.events()[0].metadata["path"], "local");
    }

    #[tokio::test]
    async fn face_restore_without_providers_is_unavailable() {
        let (mut session, _) = session_with_log();
        let err = session
            .enhance_remote(RemoteOperation::FaceRestore)
            .await
            .unwrap_err();
        assert!(matches!(err, RetouchError::RemoteUnavailable { .. }));
        assert_eq!(session.history().len(), 1);
    }

    #[tokio::test]
    async fn remote_results_survive_replay() {
        let (session, _) = session_with_log();
        let mut session = session.with_gateway(EnhancementGateway::new().with_provider(FixedImage));
        session.apply(EditOp::Blur).await.unwrap();
        session.enhance_remote(RemoteOperation::FaceRestore).await.unwrap();
        session.apply(EditOp::Sharpen).await.unwrap();
        let before = Arc::clone(session.current_image());

        session.replay().await.unwrap();
        assert_eq!(session.history().len(), 4);
        assert_eq!(session.history().entries()[2].tool_name, "Face Restore");
        assert_eq!(session.current_image().samples(), before.samples());
    }

    #[tokio::test]
    async fn ascii_is_not_a_history_entry() {
        let white = Raster::filled(20, 20, [255, 255, 255, 255]).unwrap();
        let session = EditSession::new(white);
        let art = session
            .ascii(AsciiOptions {
                columns: 10,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(art, ["          "; 5].join("\n"));
        assert_eq!(session.history().len(), 1);
    }

    #[tokio::test]
    async fn load_replaces_the_history() {
        let (mut session, _) = session_with_log();
        session.apply(EditOp::Blur).await.unwrap();
        session.load(Raster::filled(3, 3, [0, 0, 0, 255]).unwrap());
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.current_image().dimensions(), (3, 3));
    }
}
