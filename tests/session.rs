//! Integration tests for the upload session.
//!
//! The remote model is replaced by [`StubAnalyzer`], so these tests never
//! touch the network. Images are synthesised with the `image` crate and,
//! where a real file is needed, written to a temp directory.

use async_trait::async_trait;
use examquest::error::{DECODE_FAILED_MESSAGE, INVALID_FILE_MESSAGE, UNPARSABLE_RESPONSE_MESSAGE};
use examquest::{
    AnalysisConfig, AnalysisResult, ExamAnalyzer, ExamQuestError, ImageData, SelectedFile,
    SessionObserver, SessionStatus, SuggestedSolution, UploadController,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

// ── Test helpers ─────────────────────────────────────────────────────────────

enum Reply {
    Ok(AnalysisResult),
    Transport(&'static str),
    Raw(&'static str),
    Hang,
}

struct StubAnalyzer {
    reply: Reply,
    calls: AtomicUsize,
    seen: Mutex<Vec<ImageData>>,
    started: Arc<Notify>,
}

impl StubAnalyzer {
    fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            started: Arc::new(Notify::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExamAnalyzer for StubAnalyzer {
    async fn analyze(&self, image: &ImageData) -> Result<AnalysisResult, ExamQuestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(image.clone());
        self.started.notify_one();
        match &self.reply {
            Reply::Ok(result) => Ok(result.clone()),
            Reply::Transport(msg) => Err(ExamQuestError::Transport {
                message: msg.to_string(),
            }),
            Reply::Raw(body) => examquest::parse_analysis(body),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(600)).await;
                Err(ExamQuestError::Internal("unreachable".into()))
            }
        }
    }
}

#[derive(Default)]
struct Recorder {
    transitions: Mutex<Vec<(SessionStatus, u8)>>,
    errors: Mutex<Vec<String>>,
}

impl Recorder {
    fn statuses(&self) -> Vec<SessionStatus> {
        self.transitions.lock().unwrap().iter().map(|(s, _)| *s).collect()
    }
}

impl SessionObserver for Recorder {
    fn on_transition(&self, status: SessionStatus, progress: u8) {
        self.transitions.lock().unwrap().push((status, progress));
    }

    fn on_error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}

fn sample_result() -> AnalysisResult {
    AnalysisResult {
        text: "Section A\nQ1. Explain Ohm's law.\nQ2. ओम का नियम समझाइए।".into(),
        language: "English, Hindi".into(),
        summary: Some("Class 10 physics guess paper on electricity.".into()),
        key_topics: vec!["Ohm's law".into(), "Resistance".into(), "Circuits".into()],
        suggested_solutions: vec![SuggestedSolution {
            question: "Explain Ohm's law.".into(),
            answer: "V = IR at constant temperature.".into(),
        }],
    }
}

fn controller(analyzer: Arc<StubAnalyzer>) -> (UploadController, Arc<Recorder>) {
    controller_with(analyzer, AnalysisConfig::builder())
}

fn controller_with(
    analyzer: Arc<StubAnalyzer>,
    builder: examquest::AnalysisConfigBuilder,
) -> (UploadController, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let config = builder
        .observer(recorder.clone() as Arc<dyn SessionObserver>)
        .build()
        .expect("valid config");
    (UploadController::new(analyzer, config), recorder)
}

fn encoded(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([240, 240, 230])));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format)
        .expect("encode test image");
    buf
}

fn decoded_dims(image: &ImageData) -> (u32, u32) {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    let bytes = STANDARD.decode(&image.data).expect("base64");
    let img = image::load_from_memory(&bytes).expect("decode compressed");
    (img.width(), img.height())
}

// ── Scenarios ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn large_jpeg_goes_through_every_stage() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("guess-paper.jpg");
    std::fs::write(&path, encoded(3000, 4000, ImageFormat::Jpeg)).unwrap();

    let analyzer = StubAnalyzer::new(Reply::Ok(sample_result()));
    let (mut ctl, rec) = controller(analyzer.clone());

    let result = ctl.select(SelectedFile::from_path(&path)).await.expect("completed");
    assert_eq!(result, sample_result());

    assert_eq!(
        rec.statuses(),
        vec![
            SessionStatus::Uploading,
            SessionStatus::Compressing,
            SessionStatus::Analyzing,
            SessionStatus::Completed,
        ]
    );
    assert_eq!(ctl.status(), SessionStatus::Completed);
    assert_eq!(ctl.session().result(), Some(&sample_result()));
    assert!(ctl.session().error_message().is_none());
    assert_eq!(ctl.session().progress(), 100);

    let seen = analyzer.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].mime_type, "image/jpeg");
    assert_eq!(decoded_dims(&seen[0]), (1200, 1600));
}

#[tokio::test]
async fn pdf_is_rejected_without_io() {
    // The path does not exist: reaching the read step would yield a read
    // error, not the validation error.
    let analyzer = StubAnalyzer::new(Reply::Ok(sample_result()));
    let (mut ctl, rec) = controller(analyzer.clone());

    let err = ctl
        .select(SelectedFile::from_path("/no/such/dir/notes.pdf"))
        .await
        .unwrap_err();

    assert!(matches!(err, ExamQuestError::InvalidFileType { .. }));
    assert_eq!(ctl.status(), SessionStatus::Error);
    assert_eq!(ctl.session().error_message(), Some(INVALID_FILE_MESSAGE));
    assert_eq!(rec.statuses(), vec![SessionStatus::Error]);
    assert_eq!(rec.errors.lock().unwrap()[0], "Please select a valid image file.");
    assert_eq!(analyzer.calls(), 0);
}

#[tokio::test]
async fn network_error_message_is_verbatim() {
    let analyzer = StubAnalyzer::new(Reply::Transport("error sending request: connection refused"));
    let (mut ctl, _rec) = controller(analyzer);

    let file = SelectedFile::from_bytes("p.png", "image/png", encoded(40, 30, ImageFormat::Png));
    let err = ctl.select(file).await.unwrap_err();

    assert!(matches!(err, ExamQuestError::Transport { .. }));
    assert_eq!(ctl.status(), SessionStatus::Error);
    assert_eq!(
        ctl.session().error_message(),
        Some("error sending request: connection refused")
    );
    assert!(ctl.session().result().is_none());
}

#[tokio::test]
async fn malformed_response_is_uniform_error() {
    let analyzer = StubAnalyzer::new(Reply::Raw(r#"{"text": "Q1. Def"#));
    let (mut ctl, _rec) = controller(analyzer);

    let file = SelectedFile::from_bytes("p.png", "image/png", encoded(40, 30, ImageFormat::Png));
    let err = ctl.select(file).await.unwrap_err();

    assert!(matches!(err, ExamQuestError::UnparsableResponse));
    assert_eq!(ctl.session().error_message(), Some(UNPARSABLE_RESPONSE_MESSAGE));
}

#[tokio::test]
async fn undecodable_image_fails_instead_of_hanging() {
    let analyzer = StubAnalyzer::new(Reply::Ok(sample_result()));
    let (mut ctl, rec) = controller(analyzer.clone());

    let file = SelectedFile::from_bytes("p.jpg", "image/jpeg", b"not really a jpeg".to_vec());
    let err = tokio::time::timeout(Duration::from_secs(10), ctl.select(file))
        .await
        .expect("must not hang")
        .unwrap_err();

    assert!(matches!(err, ExamQuestError::ImageDecodeFailed { .. }));
    assert_eq!(ctl.session().error_message(), Some(DECODE_FAILED_MESSAGE));
    assert_eq!(
        rec.statuses(),
        vec![
            SessionStatus::Uploading,
            SessionStatus::Compressing,
            SessionStatus::Error
        ]
    );
    assert_eq!(analyzer.calls(), 0);
}

#[tokio::test]
async fn unreadable_file_is_read_error() {
    let analyzer = StubAnalyzer::new(Reply::Ok(sample_result()));
    let (mut ctl, _rec) = controller(analyzer);

    let err = ctl
        .select(SelectedFile::from_path("/no/such/dir/paper.jpg"))
        .await
        .unwrap_err();
    assert!(matches!(err, ExamQuestError::ReadFailed { .. }));
    assert_eq!(
        ctl.session().error_message(),
        Some("Failed to read the selected file.")
    );
}

#[tokio::test]
async fn small_image_keeps_dimensions() {
    let analyzer = StubAnalyzer::new(Reply::Ok(sample_result()));
    let (mut ctl, _rec) = controller(analyzer.clone());

    let file = SelectedFile::from_bytes("p.png", "image/png", encoded(800, 600, ImageFormat::Png));
    ctl.select(file).await.expect("completed");

    let seen = analyzer.seen.lock().unwrap();
    assert_eq!(decoded_dims(&seen[0]), (800, 600));
    assert_eq!(seen[0].mime_type, "image/jpeg");
}

#[tokio::test]
async fn progress_never_decreases() {
    let analyzer = StubAnalyzer::new(Reply::Transport("boom"));
    let (mut ctl, rec) = controller(analyzer);

    let file = SelectedFile::from_bytes("p.png", "image/png", encoded(20, 20, ImageFormat::Png));
    let _ = ctl.select(file).await;

    let progress: Vec<u8> = rec.transitions.lock().unwrap().iter().map(|(_, p)| *p).collect();
    assert!(progress.windows(2).all(|w| w[0] <= w[1]), "{progress:?}");
    assert_eq!(ctl.session().progress(), 60);
}

#[tokio::test]
async fn reset_is_idempotent_from_every_state() {
    let analyzer = StubAnalyzer::new(Reply::Ok(sample_result()));
    let (mut ctl, _rec) = controller(analyzer);

    // From idle.
    ctl.reset();
    ctl.reset();
    assert_eq!(ctl.status(), SessionStatus::Idle);

    // From completed.
    let file = SelectedFile::from_bytes("p.png", "image/png", encoded(20, 20, ImageFormat::Png));
    ctl.select(file).await.unwrap();
    ctl.reset();
    assert_eq!(ctl.status(), SessionStatus::Idle);
    assert!(ctl.session().result().is_none());
    assert!(ctl.session().image().is_none());
    assert_eq!(ctl.session().progress(), 0);

    // From error.
    let _ = ctl
        .select(SelectedFile::from_bytes("x.txt", "text/plain", vec![]))
        .await;
    assert_eq!(ctl.status(), SessionStatus::Error);
    ctl.reset();
    ctl.reset();
    assert_eq!(ctl.status(), SessionStatus::Idle);
    assert!(ctl.session().error_message().is_none());
}

#[tokio::test]
async fn new_selection_replaces_terminal_session() {
    let analyzer = StubAnalyzer::new(Reply::Ok(sample_result()));
    let (mut ctl, _rec) = controller(analyzer);

    let _ = ctl
        .select(SelectedFile::from_bytes("a.pdf", "application/pdf", vec![]))
        .await;
    assert_eq!(ctl.status(), SessionStatus::Error);

    let file = SelectedFile::from_bytes("p.png", "image/png", encoded(20, 20, ImageFormat::Png));
    ctl.select(file).await.unwrap();
    assert_eq!(ctl.status(), SessionStatus::Completed);
    assert!(ctl.session().error_message().is_none());
}

#[tokio::test]
async fn cancel_during_analysis_returns_to_idle() {
    let analyzer = StubAnalyzer::new(Reply::Hang);
    let (mut ctl, rec) = controller(analyzer.clone());

    let handle = ctl.cancel_handle();
    let started = analyzer.started.clone();
    tokio::spawn(async move {
        started.notified().await;
        handle.cancel();
    });

    let file = SelectedFile::from_bytes("p.png", "image/png", encoded(20, 20, ImageFormat::Png));
    let err = tokio::time::timeout(Duration::from_secs(10), ctl.select(file))
        .await
        .expect("cancel must interrupt the call")
        .unwrap_err();

    assert!(matches!(err, ExamQuestError::Cancelled));
    assert_eq!(ctl.status(), SessionStatus::Idle);
    assert!(ctl.session().result().is_none());
    assert!(ctl.session().error_message().is_none());
    assert_eq!(rec.statuses().last(), Some(&SessionStatus::Idle));
}

#[tokio::test]
async fn cancel_before_select_is_not_lost() {
    let analyzer = StubAnalyzer::new(Reply::Ok(sample_result()));
    let (mut ctl, _rec) = controller(analyzer.clone());

    ctl.cancel_handle().cancel();
    let file = SelectedFile::from_bytes("p.png", "image/png", encoded(20, 20, ImageFormat::Png));
    let err = ctl.select(file).await.unwrap_err();
    assert!(matches!(err, ExamQuestError::Cancelled));
    assert_eq!(ctl.status(), SessionStatus::Idle);
    assert_eq!(analyzer.calls(), 0);

    // The pending cancel was consumed; the next selection runs normally.
    let file = SelectedFile::from_bytes("p.png", "image/png", encoded(20, 20, ImageFormat::Png));
    ctl.select(file).await.unwrap();
    assert_eq!(ctl.status(), SessionStatus::Completed);
    assert_eq!(analyzer.calls(), 1);
}

#[tokio::test]
async fn slow_model_times_out() {
    let analyzer = StubAnalyzer::new(Reply::Hang);
    let (mut ctl, _rec) = controller_with(analyzer, AnalysisConfig::builder().api_timeout_secs(1));

    let file = SelectedFile::from_bytes("p.png", "image/png", encoded(20, 20, ImageFormat::Png));
    let err = ctl.select(file).await.unwrap_err();

    assert!(matches!(err, ExamQuestError::Timeout { secs: 1 }));
    assert_eq!(ctl.status(), SessionStatus::Error);
    assert!(ctl.session().error_message().unwrap().contains("1s"));
}
