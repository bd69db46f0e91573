//! Integration tests for the extraction pipeline.
//!
//! Pages come from an in-memory [`BitmapPageSource`] and detections from a
//! scripted [`FaceDetector`], so these tests need neither pdfium nor a
//! cascade file. Output goes to `tempfile` directories and written JPEGs are
//! decoded back with `image`.

use image::GrayImage;
use pdf_face_extract::{
    run_pipeline, BitmapPageSource, DetectionBox, ExtractionConfig, ExtractionProgressCallback,
    FaceDetector, FaceExtractError, PageBitmap, PageSelection, SavedFace,
};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Returns one scripted batch of boxes per call, then nothing.
struct ScriptedDetector {
    batches: Mutex<VecDeque<Vec<DetectionBox>>>,
    seen_sizes: Mutex<Vec<(u32, u32)>>,
}

impl ScriptedDetector {
    fn new(batches: Vec<Vec<DetectionBox>>) -> Self {
        Self {
            batches: Mutex::new(batches.into()),
            seen_sizes: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<(u32, u32)> {
        self.seen_sizes.lock().unwrap().clone()
    }
}

impl FaceDetector for ScriptedDetector {
    fn detect(&self, gray: &GrayImage) -> Vec<DetectionBox> {
        self.seen_sizes.lock().unwrap().push(gray.dimensions());
        self.batches.lock().unwrap().pop_front().unwrap_or_default()
    }
}

/// Records every progress event as a string.
#[derive(Default)]
struct RecordingCallback {
    events: Mutex<Vec<String>>,
}

impl RecordingCallback {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, e: String) {
        self.events.lock().unwrap().push(e);
    }
}

impl ExtractionProgressCallback for RecordingCallback {
    fn on_extraction_start(&self, total_pages: usize) {
        self.push(format!("start {total_pages}"));
    }
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        self.push(format!("page {page_num}/{total_pages}"));
    }
    fn on_face_saved(&self, face: &SavedFace) {
        self.push(format!("saved {} p{}", face.file_name, face.page_num));
    }
    fn on_page_complete(&self, page_num: usize, _total_pages: usize, faces: usize) {
        self.push(format!("done {page_num} faces={faces}"));
    }
    fn on_extraction_complete(&self, total_pages: usize, total_faces: usize) {
        self.push(format!("complete {total_pages} {total_faces}"));
    }
}

fn rgb_page(width: u32, height: u32, rgb: [u8; 3]) -> PageBitmap {
    let samples = rgb
        .iter()
        .copied()
        .cycle()
        .take((width * height * 3) as usize)
        .collect();
    PageBitmap::new(width, height, 3, samples).unwrap()
}

fn rgba_page(width: u32, height: u32, rgba: [u8; 4]) -> PageBitmap {
    let samples = rgba
        .iter()
        .copied()
        .cycle()
        .take((width * height * 4) as usize)
        .collect();
    PageBitmap::new(width, height, 4, samples).unwrap()
}

fn config_for(dir: &Path) -> ExtractionConfig {
    ExtractionConfig::builder().output_dir(dir).build().unwrap()
}

fn sorted_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn face(x: u32, y: u32, size: u32) -> DetectionBox {
    DetectionBox::new(x, y, size, size)
}

// ── Naming and counting ──────────────────────────────────────────────────────

#[test]
fn files_are_numbered_across_pages_without_gaps() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("faces");
    let source = BitmapPageSource::new(vec![
        rgb_page(400, 300, [200, 180, 160]),
        rgb_page(400, 300, [10, 20, 30]),
        rgb_page(400, 300, [90, 90, 90]),
    ]);
    let detector = ScriptedDetector::new(vec![
        vec![face(10, 10, 100), face(200, 50, 120)],
        vec![],
        vec![face(150, 100, 100)],
    ]);

    let output = run_pipeline(&source, &detector, &config_for(&out)).unwrap();

    let names: Vec<&str> = output.faces.iter().map(|f| f.file_name.as_str()).collect();
    assert_eq!(names, ["face_1.jpg", "face_2.jpg", "face_3.jpg"]);
    let pages: Vec<usize> = output.faces.iter().map(|f| f.page_num).collect();
    assert_eq!(pages, [1, 1, 3]);
    assert_eq!(sorted_entries(&out), ["face_1.jpg", "face_2.jpg", "face_3.jpg"]);

    assert_eq!(output.stats.total_pages, 3);
    assert_eq!(output.stats.processed_pages, 3);
    assert_eq!(output.stats.total_faces, 3);
    assert_eq!(output.metadata.page_count, 3);
    // Detector sees the full-resolution page.
    assert_eq!(detector.calls(), vec![(400, 300); 3]);
}

#[test]
fn zero_pages_creates_empty_output_dir() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("nested/empty");
    let detector = ScriptedDetector::new(vec![]);

    let output = run_pipeline(&BitmapPageSource::default(), &detector, &config_for(&out)).unwrap();

    assert!(out.is_dir());
    assert!(sorted_entries(&out).is_empty());
    assert_eq!(output.stats.total_faces, 0);
    assert_eq!(output.stats.total_pages, 0);
    assert!(detector.calls().is_empty());
}

#[test]
fn pages_without_faces_write_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let source = BitmapPageSource::new(vec![rgb_page(50, 50, [255, 255, 255]); 2]);
    let detector = ScriptedDetector::new(vec![vec![], vec![]]);

    let output = run_pipeline(&source, &detector, &config_for(tmp.path())).unwrap();

    assert!(output.faces.is_empty());
    assert_eq!(output.stats.processed_pages, 2);
    assert!(sorted_entries(tmp.path()).is_empty());
}

#[test]
fn reruns_produce_identical_files() {
    let run = |dir: &Path| {
        let source = BitmapPageSource::new(vec![rgb_page(300, 300, [120, 60, 30])]);
        let detector = ScriptedDetector::new(vec![vec![face(40, 40, 100)]]);
        run_pipeline(&source, &detector, &config_for(dir)).unwrap()
    };
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    let out_a = run(a.path());
    let out_b = run(b.path());

    assert_eq!(out_a.faces[0].crop, out_b.faces[0].crop);
    assert_eq!(
        std::fs::read(a.path().join("face_1.jpg")).unwrap(),
        std::fs::read(b.path().join("face_1.jpg")).unwrap()
    );
}

// ── Crop geometry on disk ────────────────────────────────────────────────────

#[test]
fn written_images_have_margin_expanded_dimensions() {
    let tmp = tempfile::tempdir().unwrap();
    let (w, h) = (500u32, 400u32);
    let source = BitmapPageSource::new(vec![rgb_page(w, h, [128, 128, 128])]);
    let boxes = vec![
        face(200, 150, 100), // interior: margin 20 on every side
        face(5, 5, 100),     // clipped top-left
        face(440, 350, 100), // clipped bottom-right
    ];
    let detector = ScriptedDetector::new(vec![boxes.clone()]);

    let output = run_pipeline(&source, &detector, &config_for(tmp.path())).unwrap();
    assert_eq!(output.faces.len(), 3);

    for (saved, det) in output.faces.iter().zip(&boxes) {
        let m = (det.width as f64 * 0.2).floor() as i64;
        let (x, y, bw, bh) = (det.x as i64, det.y as i64, det.width as i64, det.height as i64);
        let exp_w = (w as i64).min(x + bw + m) - 0i64.max(x - m);
        let exp_h = (h as i64).min(y + bh + m) - 0i64.max(y - m);

        let img = image::open(&saved.path).unwrap();
        assert_eq!(img.width() as i64, exp_w, "{}", saved.file_name);
        assert_eq!(img.height() as i64, exp_h, "{}", saved.file_name);
        assert_eq!(saved.detection, *det);
    }

    assert_eq!((output.faces[0].crop.width, output.faces[0].crop.height), (140, 140));
}

#[test]
fn rgba_pages_keep_their_colour() {
    let tmp = tempfile::tempdir().unwrap();
    let source = BitmapPageSource::new(vec![rgba_page(200, 200, [220, 40, 30, 0])]);
    let detector = ScriptedDetector::new(vec![vec![face(50, 50, 100)]]);

    let output = run_pipeline(&source, &detector, &config_for(tmp.path())).unwrap();

    let img = image::open(&output.faces[0].path).unwrap().to_rgb8();
    let px = img.get_pixel(img.width() / 2, img.height() / 2);
    // JPEG is lossy; the red channel must still dominate.
    assert!(px[0] > 180 && px[1] < 90 && px[2] < 90, "got {px:?}");
}

// ── Failure behaviour ────────────────────────────────────────────────────────

#[test]
fn unsupported_channel_count_aborts_and_keeps_earlier_files() {
    let tmp = tempfile::tempdir().unwrap();
    let gray_page = PageBitmap::new(100, 100, 1, vec![0; 100 * 100]).unwrap();
    let source = BitmapPageSource::new(vec![
        rgb_page(200, 200, [100, 100, 100]),
        gray_page,
        rgb_page(200, 200, [100, 100, 100]),
    ]);
    let detector = ScriptedDetector::new(vec![vec![face(10, 10, 100)], vec![face(0, 0, 50)]]);

    let err = run_pipeline(&source, &detector, &config_for(tmp.path())).unwrap_err();

    match err {
        FaceExtractError::UnsupportedFormat { page, channels } => {
            assert_eq!((page, channels), (2, 1));
        }
        other => panic!("expected UnsupportedFormat, got {other:?}"),
    }
    assert_eq!(sorted_entries(tmp.path()), ["face_1.jpg"]);
    // Page 2 failed before detection; page 3 was never reached.
    assert_eq!(detector.calls().len(), 1);
}

#[test]
fn selection_outside_document_is_out_of_range() {
    let tmp = tempfile::tempdir().unwrap();
    let source = BitmapPageSource::new(vec![rgb_page(10, 10, [0, 0, 0]); 2]);
    let config = ExtractionConfig::builder()
        .output_dir(tmp.path())
        .pages(PageSelection::Single(5))
        .build()
        .unwrap();

    let err = run_pipeline(&source, &ScriptedDetector::new(vec![]), &config).unwrap_err();
    match err {
        FaceExtractError::PageOutOfRange { page, total } => assert_eq!((page, total), (5, 2)),
        other => panic!("expected PageOutOfRange, got {other:?}"),
    }
}

#[test]
fn unwritable_output_dir_fails_before_scanning() {
    let tmp = tempfile::tempdir().unwrap();
    let blocker = tmp.path().join("file");
    std::fs::write(&blocker, b"not a directory").unwrap();
    let detector = ScriptedDetector::new(vec![]);
    let source = BitmapPageSource::new(vec![rgb_page(10, 10, [0, 0, 0])]);

    let err = run_pipeline(&source, &detector, &config_for(&blocker.join("faces"))).unwrap_err();
    assert!(matches!(err, FaceExtractError::OutputDirFailed { .. }));
    assert!(detector.calls().is_empty());
}

#[test]
fn detection_outside_page_is_an_error() {
    let tmp = tempfile::tempdir().unwrap();
    let source = BitmapPageSource::new(vec![rgb_page(100, 100, [0, 0, 0])]);
    let detector = ScriptedDetector::new(vec![vec![face(500, 500, 40)]]);

    let err = run_pipeline(&source, &detector, &config_for(tmp.path())).unwrap_err();
    assert!(matches!(err, FaceExtractError::EmptyCrop { page: 1, .. }));
    assert!(sorted_entries(tmp.path()).is_empty());
}

// ── Page selection and progress ──────────────────────────────────────────────

#[test]
fn selected_pages_share_one_counter() {
    let tmp = tempfile::tempdir().unwrap();
    let source = BitmapPageSource::new(vec![rgb_page(200, 200, [50, 50, 50]); 4]);
    let detector = ScriptedDetector::new(vec![vec![face(0, 0, 100)], vec![face(50, 50, 100)]]);
    let config = ExtractionConfig::builder()
        .output_dir(tmp.path())
        .pages(PageSelection::Set(vec![4, 2, 4]))
        .build()
        .unwrap();

    let output = run_pipeline(&source, &detector, &config).unwrap();

    let got: Vec<(String, usize)> = output
        .faces
        .iter()
        .map(|f| (f.file_name.clone(), f.page_num))
        .collect();
    assert_eq!(
        got,
        [("face_1.jpg".to_string(), 2), ("face_2.jpg".to_string(), 4)]
    );
    assert_eq!(output.stats.total_pages, 4);
    assert_eq!(output.stats.processed_pages, 2);
}

#[test]
fn progress_events_follow_document_order() {
    let tmp = tempfile::tempdir().unwrap();
    let recorder = Arc::new(RecordingCallback::default());
    let source = BitmapPageSource::new(vec![rgb_page(200, 200, [50, 50, 50]); 2]);
    let detector = ScriptedDetector::new(vec![vec![face(0, 0, 100), face(90, 90, 100)], vec![]]);
    let config = ExtractionConfig::builder()
        .output_dir(tmp.path())
        .progress_callback(recorder.clone() as Arc<dyn ExtractionProgressCallback>)
        .build()
        .unwrap();

    run_pipeline(&source, &detector, &config).unwrap();

    assert_eq!(
        recorder.events(),
        [
            "start 2",
            "page 1/2",
            "saved face_1.jpg p1",
            "saved face_2.jpg p1",
            "done 1 faces=2",
            "page 2/2",
            "done 2 faces=0",
            "complete 2 2",
        ]
    );
}

#[test]
fn saved_paths_live_in_the_output_dir() {
    let tmp = tempfile::tempdir().unwrap();
    let out: PathBuf = tmp.path().join("out");
    let source = BitmapPageSource::new(vec![rgb_page(150, 150, [1, 2, 3])]);
    let detector = ScriptedDetector::new(vec![vec![face(20, 20, 100)]]);

    let output = run_pipeline(&source, &detector, &config_for(&out)).unwrap();

    assert_eq!(output.faces[0].path, out.join("face_1.jpg"));
    assert!(output.faces[0].path.is_file());
    let json = serde_json::to_value(&output).unwrap();
    assert_eq!(json["faces"][0]["file_name"], "face_1.jpg");
    assert_eq!(json["stats"]["total_faces"], 1);
}
