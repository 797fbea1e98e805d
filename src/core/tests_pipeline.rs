//! End-to-end pipeline tests over a stub transformer.
//!
//! These drive the full service surface — ingestion, derivation chain,
//! subtitles, analytics — without any external binaries: the stub
//! implements the `Transformer` contract, writing plausible artifacts
//! where the real tools would.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use crate::core::{
    config::PipelineConfig,
    directives::{ToolKind, TransformationDirective},
    ledger::AssetStage,
    pipeline::StageParams,
    service::{MediaService, MetadataPatch},
    tools::{ToolOutput, Transformer},
    CoreError, CoreResult,
};

/// Stub tool host: ffprobe answers canned reports, ffmpeg writes fake
/// artifacts, whisper writes a canned transcript.
struct StubTransformer {
    fail_ffmpeg: AtomicBool,
    time_out_ffmpeg: AtomicBool,
    /// Duration reported when probing a derived (edited/exported) artifact.
    derived_probe_duration: Mutex<f64>,
    invocations: Mutex<Vec<TransformationDirective>>,
}

impl StubTransformer {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            fail_ffmpeg: AtomicBool::new(false),
            time_out_ffmpeg: AtomicBool::new(false),
            derived_probe_duration: Mutex::new(10.0),
            invocations: Mutex::new(Vec::new()),
        })
    }

    fn probe_report(&self, duration: f64) -> String {
        format!(
            r#"{{
                "format": {{"duration": "{duration}", "format_name": "matroska,webm"}},
                "streams": [
                    {{"codec_type": "video", "codec_name": "vp9", "width": 1920, "height": 1080}},
                    {{"codec_type": "audio", "codec_name": "opus", "sample_rate": "48000", "channels": 2}}
                ]
            }}"#
        )
    }

    fn write_wav(path: &std::path::Path) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..128i16 {
            writer.write_sample(i).unwrap();
        }
        writer.finalize().unwrap();
    }
}

#[async_trait]
impl Transformer for StubTransformer {
    async fn run(
        &self,
        directive: &TransformationDirective,
        _deadline: Duration,
    ) -> CoreResult<ToolOutput> {
        self.invocations.lock().unwrap().push(directive.clone());

        let ok = |stdout: String| {
            Ok(ToolOutput {
                exit_code: Some(0),
                stdout,
                stderr: String::new(),
            })
        };

        match directive.tool {
            ToolKind::Ffprobe => {
                let is_derived = directive
                    .input
                    .parent()
                    .and_then(|p| p.file_name())
                    .is_some_and(|dir| dir == "edited" || dir == "exports");
                let duration = if is_derived {
                    *self.derived_probe_duration.lock().unwrap()
                } else {
                    10.0
                };
                ok(self.probe_report(duration))
            }
            ToolKind::Ffmpeg => {
                if self.time_out_ffmpeg.load(Ordering::SeqCst) {
                    return Err(CoreError::Timeout("stub deadline elapsed".to_string()));
                }
                if self.fail_ffmpeg.load(Ordering::SeqCst) {
                    return Err(CoreError::upstream_exit(Some(1), "stub: encoder exploded"));
                }

                let output = directive.output.clone().expect("ffmpeg directive has output");
                if output.extension().is_some_and(|e| e == "wav") {
                    Self::write_wav(&output);
                } else {
                    std::fs::write(&output, b"stub media payload").unwrap();
                }
                ok(String::new())
            }
            ToolKind::Whisper => {
                let dir_flag = directive
                    .args
                    .iter()
                    .position(|a| a == "--output_dir")
                    .expect("whisper directive has output dir");
                let out_dir = PathBuf::from(&directive.args[dir_flag + 1]);
                let stem = directive
                    .input
                    .file_stem()
                    .unwrap()
                    .to_string_lossy()
                    .to_string();
                std::fs::write(
                    out_dir.join(format!("{stem}.json")),
                    r#"{"language": "en", "segments": [
                        {"start": 65.25, "end": 67.0, "text": " hi"}
                    ]}"#,
                )
                .unwrap();
                ok(String::new())
            }
        }
    }
}

fn service_with_stub() -> (MediaService, Arc<StubTransformer>, TempDir) {
    let dir = TempDir::new().unwrap();
    let mut config = PipelineConfig::default();
    config.media_root = dir.path().to_path_buf();
    config.max_concurrent_tools = 4;

    let stub = StubTransformer::new();
    let service = MediaService::with_transformer(config, stub.clone()).unwrap();
    (service, stub, dir)
}

fn leftover_scratch(dir: &TempDir) -> Vec<PathBuf> {
    std::fs::read_dir(dir.path().join(".scratch"))
        .map(|entries| entries.filter_map(|e| e.ok()).map(|e| e.path()).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn ingest_then_trim_derives_a_new_record() {
    let (service, _stub, _dir) = service_with_stub();

    let raw_id = service.create_raw_asset(b"captured bytes").await.unwrap();
    let raw = service.get_asset(&raw_id).unwrap();
    assert_eq!(raw.stage, AssetStage::Raw);
    assert_eq!(raw.duration_sec, 10.0);

    let trimmed_id = service.trim_asset(&raw_id, 2.0, 7.0).await.unwrap();
    assert_ne!(trimmed_id, raw_id);

    let trimmed = service.get_asset(&trimmed_id).unwrap();
    assert_eq!(trimmed.lineage.as_deref(), Some(raw_id.as_str()));
    assert_eq!(trimmed.stage, AssetStage::Trimmed);
    assert_eq!(trimmed.duration_sec, 5.0);
    assert!(PathBuf::from(&trimmed.storage_locator).exists());
}

#[tokio::test]
async fn edit_chain_advances_stages_until_export_is_terminal() {
    let (service, _stub, _dir) = service_with_stub();

    let raw_id = service.create_raw_asset(b"captured").await.unwrap();
    let trimmed_id = service.trim_asset(&raw_id, 0.0, 5.0).await.unwrap();
    let texted_id = service
        .apply_text_overlay(&trimmed_id, "hello", 1.0, 3.0)
        .await
        .unwrap();
    let blurred_id = service
        .apply_blur(&texted_id, 10, 10, 200, 100, 1.0, 2.0)
        .await
        .unwrap();
    let arrowed_id = service
        .apply_arrow(&blurred_id, 0.0, 0.0, 100.0, 50.0, 0.5, 1.5)
        .await
        .unwrap();

    let arrowed = service.get_asset(&arrowed_id).unwrap();
    assert_eq!(arrowed.stage, AssetStage::Edited);
    // Edits inherit the source duration.
    assert_eq!(arrowed.duration_sec, 5.0);

    let exported = service.export_final(&arrowed_id).await.unwrap();
    assert!(exported.exists());

    let exported_record = service
        .list_assets()
        .into_iter()
        .find(|r| r.stage == AssetStage::Exported)
        .unwrap();
    assert_eq!(exported_record.lineage.as_deref(), Some(arrowed_id.as_str()));

    // Exported is terminal: nothing derives from it.
    let err = service
        .apply_text_overlay(&exported_record.id, "late", 0.0, 1.0)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));
}

#[tokio::test]
async fn wrong_predecessor_stage_is_not_found_before_any_side_effect() {
    let (service, stub, dir) = service_with_stub();

    let raw_id = service.create_raw_asset(b"captured").await.unwrap();
    let invocations_before = stub.invocations.lock().unwrap().len();

    // Text overlay requires a trimmed (or edited) source.
    let err = service
        .apply_text_overlay(&raw_id, "hello", 0.0, 1.0)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));

    assert_eq!(stub.invocations.lock().unwrap().len(), invocations_before);
    assert!(leftover_scratch(&dir).is_empty());
}

#[tokio::test]
async fn failed_transformation_leaves_no_artifact_and_no_record() {
    let (service, stub, dir) = service_with_stub();

    let raw_id = service.create_raw_asset(b"captured").await.unwrap();
    let records_before = service.list_assets().len();

    stub.fail_ffmpeg.store(true, Ordering::SeqCst);
    let err = service.trim_asset(&raw_id, 2.0, 7.0).await.unwrap_err();
    assert!(matches!(err, CoreError::Upstream { status: Some(1), .. }));

    assert_eq!(service.list_assets().len(), records_before);
    let trimmed_dir: Vec<_> = std::fs::read_dir(dir.path().join("trimmed"))
        .unwrap()
        .collect();
    assert!(trimmed_dir.is_empty());
    assert!(leftover_scratch(&dir).is_empty());

    // Counters on the source are untouched.
    assert_eq!(service.get_asset(&raw_id).unwrap().view_count, 0);
}

#[tokio::test]
async fn timed_out_transformation_discards_partial_output() {
    let (service, stub, dir) = service_with_stub();

    let raw_id = service.create_raw_asset(b"captured").await.unwrap();
    stub.time_out_ffmpeg.store(true, Ordering::SeqCst);

    let err = service.trim_asset(&raw_id, 0.0, 1.0).await.unwrap_err();
    assert!(matches!(err, CoreError::Timeout(_)));
    assert_eq!(service.list_assets().len(), 1);
    assert!(leftover_scratch(&dir).is_empty());
}

#[tokio::test]
async fn voiceover_merge_duration_follows_the_shorter_input() {
    let (service, stub, _dir) = service_with_stub();

    let raw_id = service.create_raw_asset(b"captured").await.unwrap();
    let trimmed_id = service.trim_asset(&raw_id, 0.0, 10.0).await.unwrap();

    // Synthesized audio shorter than the video: the merged output is
    // truncated, and its probed duration lands on the record.
    *stub.derived_probe_duration.lock().unwrap() = 7.0;

    let audio = PathBuf::from(&service.get_asset(&trimmed_id).unwrap().storage_locator)
        .with_file_name("voiceover.mp3");
    std::fs::write(&audio, b"mp3 bytes").unwrap();

    let merged_id = service
        .executor_for_tests()
        .execute(&trimmed_id, StageParams::VoiceoverMerge { audio })
        .await
        .unwrap();

    let merged = service.get_asset(&merged_id).unwrap();
    assert_eq!(merged.duration_sec, 7.0);
    assert_eq!(merged.stage, AssetStage::Edited);

    // The merge directive copies video and truncates to the shorter input.
    let invocations = stub.invocations.lock().unwrap();
    let merge = invocations
        .iter()
        .filter(|d| d.tool == ToolKind::Ffmpeg)
        .last()
        .unwrap();
    let args = merge.args.join(" ");
    assert!(args.contains("-c:v copy"));
    assert!(args.contains("-shortest"));
}

#[tokio::test]
async fn subtitles_render_the_transcript_as_srt() {
    let (service, _stub, dir) = service_with_stub();

    let raw_id = service.create_raw_asset(b"captured").await.unwrap();
    let trimmed_id = service.trim_asset(&raw_id, 0.0, 10.0).await.unwrap();

    let locator = service.generate_subtitles(&trimmed_id).await.unwrap();
    assert!(locator.starts_with(dir.path().join("subtitles")));

    let srt = std::fs::read_to_string(&locator).unwrap();
    assert!(srt.contains("00:01:05,250 --> 00:01:07,000\nhi"));
    assert!(srt.starts_with("1\n"));

    // The extracted engine audio is published too.
    assert!(dir
        .path()
        .join("audio")
        .join(format!("{trimmed_id}.wav"))
        .exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_views_count_exactly_once_each() {
    let (service, _stub, _dir) = service_with_stub();
    let service = Arc::new(service);

    let raw_id = service.create_raw_asset(b"captured").await.unwrap();

    let n = 24;
    let mut handles = Vec::new();
    for _ in 0..n {
        let service = Arc::clone(&service);
        let id = raw_id.clone();
        handles.push(tokio::spawn(async move {
            service.record_view(&id).await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(service.get_asset(&raw_id).unwrap().view_count, n);
    assert_eq!(service.average_completion(&raw_id).await.unwrap(), 0);
}

#[tokio::test]
async fn playback_and_metadata_update_in_place() {
    let (service, _stub, _dir) = service_with_stub();

    let raw_id = service.create_raw_asset(b"captured").await.unwrap();

    service.record_playback(&raw_id, 15.0).await.unwrap();
    service.record_playback(&raw_id, 5.0).await.unwrap();
    service.record_view(&raw_id).await.unwrap();
    service.record_view(&raw_id).await.unwrap();

    // 1.0 + 0.5 over two views.
    assert_eq!(service.average_completion(&raw_id).await.unwrap(), 75);

    let updated = service
        .update_metadata(
            &raw_id,
            MetadataPatch {
                title: Some("Demo run".into()),
                description: None,
                tags: Some(vec!["demo".into(), "bug".into()]),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.title.as_deref(), Some("Demo run"));
    assert!(updated.description.is_none());
    assert_eq!(updated.tags, vec!["demo", "bug"]);

    // Identity and lineage stay fixed through in-place updates.
    let record = service.get_asset(&raw_id).unwrap();
    assert_eq!(record.id, raw_id);
    assert_eq!(record.stage, AssetStage::Raw);
}

#[tokio::test]
async fn empty_capture_is_rejected() {
    let (service, _stub, _dir) = service_with_stub();
    let err = service.create_raw_asset(b"").await.unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
    assert!(service.list_assets().is_empty());
}
