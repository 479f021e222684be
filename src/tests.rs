use super::*;
use crate::deck::{EMU_PER_INCH, Slide, inches};
use crate::generative::{
    Device, DeviceProfile, GenerativeResolver, PipelineOptions, progress_message,
    should_generate,
};
use crate::images::{ImageResolver, SlideSlot};
use crate::layout;
use crate::local_index::{LocalIndexResolver, slide_number_from_name};
use image::{DynamicImage, ImageBuffer, ImageOutputFormat, Rgb};
use parking_lot::Mutex;
use std::io::{Cursor, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use zip::ZipArchive;

fn encoded_image(width: u32, height: u32, shade: u8, format: ImageOutputFormat) -> Vec<u8> {
    let img = ImageBuffer::from_pixel(width, height, Rgb([shade, 0u8, 255 - shade]));
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut cursor, format)
        .expect("Failed to encode test image");
    cursor.into_inner()
}

fn png_bytes(width: u32, height: u32, shade: u8) -> Vec<u8> {
    encoded_image(width, height, shade, ImageOutputFormat::Png)
}

fn payload(width: u32, height: u32) -> ImagePayload {
    ImagePayload::from_bytes(png_bytes(width, height, 90)).expect("Failed to build payload")
}

fn record(title: &str, bullets: &[&str], visual: &str) -> SlideRecord {
    SlideRecord {
        title: title.to_string(),
        bullets: bullets.iter().map(|b| b.to_string()).collect(),
        visual: visual.to_string(),
    }
}

fn body_width(slide: &Slide) -> i64 {
    slide
        .text_box(layout::BODY_BOX)
        .expect("Slide has no body text box")
        .frame
        .cx
}

fn slide_title(slide: &Slide) -> String {
    slide
        .text_box(layout::TITLE_BOX)
        .expect("Slide has no title text box")
        .text()
}

/// Backend producing a small solid image, optionally failing for one prompt.
struct SolidBackend {
    calls: Arc<AtomicUsize>,
    fail_on: Option<String>,
}

impl ImageBackend for SolidBackend {
    fn generate(&self, prompt: &str, _steps: u32) -> Result<DynamicImage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on.as_deref() == Some(prompt) {
            return Err(DeckError::GenerationError("out of memory".to_string()));
        }
        Ok(DynamicImage::ImageRgb8(ImageBuffer::from_pixel(
            8,
            6,
            Rgb([10u8, 20u8, 30u8]),
        )))
    }
}

/// Loader recording every load attempt and failing on chosen devices.
struct FakeLoader {
    accelerator: bool,
    failing_devices: Vec<Device>,
    attempts: Arc<Mutex<Vec<(DeviceProfile, PipelineOptions)>>>,
    generate_calls: Arc<AtomicUsize>,
    fail_on: Option<String>,
}

impl FakeLoader {
    fn new(failing_devices: Vec<Device>) -> Self {
        Self {
            accelerator: true,
            failing_devices,
            attempts: Arc::new(Mutex::new(Vec::new())),
            generate_calls: Arc::new(AtomicUsize::new(0)),
            fail_on: None,
        }
    }
}

impl BackendLoader for FakeLoader {
    fn accelerator_available(&self) -> bool {
        self.accelerator
    }

    fn load(
        &self,
        profile: DeviceProfile,
        options: &PipelineOptions,
    ) -> Result<Arc<dyn ImageBackend>> {
        self.attempts.lock().push((profile, *options));
        if self.failing_devices.contains(&profile.device) {
            return Err(DeckError::GenerationError(format!(
                "cannot load on {}",
                profile
            )));
        }
        Ok(Arc::new(SolidBackend {
            calls: Arc::clone(&self.generate_calls),
            fail_on: self.fail_on.clone(),
        }))
    }
}

// Outline parsing

#[test]
fn test_parse_well_formed_outline() {
    let records = parse_outline("TITRE: A\nPOINTS:\n- x\n- y\nVISUEL: v\n\nTITRE: B\n- z\n");

    assert_eq!(
        records,
        vec![record("A", &["x", "y"], "v"), record("B", &["z"], "")]
    );
}

#[test]
fn test_bullets_before_first_title_are_dropped() {
    let records = parse_outline("- orphan\nTITRE: A\n- x\n");

    assert_eq!(records, vec![record("A", &["x"], "")]);
}

#[test]
fn test_last_visual_wins() {
    let records = parse_outline("TITRE: A\nVISUEL: first\n- x\nVISUEL: second\n");

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].visual, "second");
}

#[test]
fn test_markers_are_case_insensitive() {
    let records = parse_outline("titre: Lower\npoints:\n• dot\nvisuel: a prompt\nTiTrE:Mixed\n");

    assert_eq!(
        records,
        vec![record("Lower", &["dot"], "a prompt"), record("Mixed", &[], "")]
    );
}

#[test]
fn test_empty_input_yields_no_records() {
    assert!(parse_outline("").is_empty());
    assert!(parse_outline("\n   \n\t\n").is_empty());
    assert!(parse_outline("- orphan\nVISUEL: lost\nsome prose").is_empty());
}

#[test]
fn test_unrecognized_lines_are_ignored() {
    let records = parse_outline(
        "Here is your outline:\nTITRE: A\nSome commentary\n- x\n**bold aside**\nVISUEL: v\n",
    );

    assert_eq!(records, vec![record("A", &["x"], "v")]);
}

#[test]
fn test_bullet_prefixes_are_stripped() {
    let records = parse_outline("TITRE: A\n-- double\n•- mixed\n-    spaced   \n  • indented\n");

    assert_eq!(
        records[0].bullets,
        vec!["double", "mixed", "spaced", "indented"]
    );
}

#[test]
fn test_title_marker_without_text() {
    let records = parse_outline("TITRE:\n- x\nTITRE:   \n");

    assert_eq!(records, vec![record("", &["x"], ""), record("", &[], "")]);
}

#[test]
fn test_windows_line_endings() {
    let records = parse_outline("TITRE: A\r\n- x\r\nVISUEL: https://example.com/a.png\r\n");

    assert_eq!(
        records,
        vec![record("A", &["x"], "https://example.com/a.png")]
    );
}

// Image payloads

#[test]
fn test_image_payload_reads_format_and_dimensions() {
    let png = ImagePayload::from_bytes(png_bytes(40, 20, 1)).expect("PNG should be accepted");
    assert_eq!(png.dimensions(), (40, 20));
    assert_eq!(png.extension(), "png");

    let jpeg = ImagePayload::from_bytes(encoded_image(16, 16, 1, ImageOutputFormat::Jpeg(80)))
        .expect("JPEG should be accepted");
    assert_eq!(jpeg.extension(), "jpeg");
}

#[test]
fn test_image_payload_rejects_empty_and_garbage() {
    assert!(matches!(
        ImagePayload::from_bytes(Vec::new()),
        Err(DeckError::ImageError(_))
    ));
    assert!(ImagePayload::from_bytes(b"<html>not found</html>".to_vec()).is_err());
}

// Local image index

#[test]
fn test_slide_number_from_name() {
    assert_eq!(slide_number_from_name("01 campus.jpg"), Some(1));
    assert_eq!(slide_number_from_name("1 campus.jpg"), Some(1));
    assert_eq!(slide_number_from_name("10 salle.png"), Some(10));
    assert_eq!(slide_number_from_name("99.png"), Some(99));
    assert_eq!(slide_number_from_name("123 three digits.png"), Some(12));
    assert_eq!(slide_number_from_name("0 zero.png"), None);
    assert_eq!(slide_number_from_name("00.png"), None);
    assert_eq!(slide_number_from_name("cover.jpg"), None);
    assert_eq!(slide_number_from_name("slide 2.jpg"), None);
    assert_eq!(slide_number_from_name(" 3 leading space.jpg"), None);
}

#[test]
fn test_local_index_first_wins() {
    let first = png_bytes(4, 4, 10);
    let second = png_bytes(4, 4, 200);
    assert_ne!(first, second);

    let index = build_index(vec![
        UploadedImage::new("1 a.jpg", first.clone()),
        UploadedImage::new("1 b.jpg", second),
    ]);

    assert_eq!(index.len(), 1);
    assert_eq!(index.get(1).expect("slide 1 should have an image").bytes(), &first[..]);
}

#[test]
fn test_local_index_never_attaches_unnumbered_files() {
    let index = build_index(vec![UploadedImage::new("cover.jpg", png_bytes(4, 4, 10))]);
    assert!(index.is_empty());

    let mut resolver = LocalIndexResolver::new(index);
    for index in 0..5 {
        let slot = SlideSlot { index, total: 5 };
        let resolution = resolver.resolve(slot, &record("Slide", &[], ""));
        assert!(matches!(resolution, ImageResolution::Skipped(_)));
    }
}

#[test]
fn test_local_index_skips_undecodable_uploads() {
    let valid = png_bytes(4, 4, 10);
    let index = build_index(vec![
        UploadedImage::new("1 broken.png", b"not an image".to_vec()),
        UploadedImage::new("1 real.png", valid.clone()),
        UploadedImage::new("2 empty.png", Vec::new()),
    ]);

    assert_eq!(index.positions().collect::<Vec<_>>(), vec![1]);
    assert_eq!(index.get(1).map(|p| p.bytes().to_vec()), Some(valid));
}

#[test]
fn test_local_resolver_uses_position_not_title() {
    let index = build_index(vec![UploadedImage::new("2 chart.png", png_bytes(4, 4, 10))]);
    assert!(local_index::resolve(&index, 2).is_some());
    assert!(local_index::resolve(&index, 3).is_none());

    let mut resolver = LocalIndexResolver::new(index);
    let first = resolver.resolve(SlideSlot { index: 0, total: 2 }, &record("2 - Chart", &[], ""));
    let second = resolver.resolve(SlideSlot { index: 1, total: 2 }, &record("Other", &[], ""));

    assert!(!first.is_attached());
    assert!(second.is_attached());
}

#[test]
fn test_collect_uploads_from_directory() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    std::fs::write(temp_dir.path().join("2 b.png"), png_bytes(4, 4, 1)).unwrap();
    std::fs::write(temp_dir.path().join("1 a.png"), png_bytes(4, 4, 2)).unwrap();
    std::fs::create_dir(temp_dir.path().join("3 folder")).unwrap();

    let uploads = UploadedImage::collect_from_dir(temp_dir.path(), "*")
        .expect("Failed to collect uploads");
    let names: Vec<&str> = uploads.iter().map(|u| u.name.as_str()).collect();

    assert_eq!(names, vec!["1 a.png", "2 b.png"]);
}

// Remote fetching (network-free cases)

#[cfg(unix)]
#[test]
fn test_collect_uploads_skips_unreadable_and_unnumbered_files() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let valid = png_bytes(4, 4, 7);
    std::fs::write(temp_dir.path().join("1 good.png"), &valid).unwrap();
    // Regular files whose reads fail with EIO
    std::os::unix::fs::symlink("/proc/self/mem", temp_dir.path().join("2 broken.png")).unwrap();
    std::os::unix::fs::symlink("/proc/self/mem", temp_dir.path().join("notes.txt")).unwrap();

    let uploads = UploadedImage::collect_from_dir(temp_dir.path(), "*")
        .expect("Unreadable files should not fail the collection");
    let names: Vec<&str> = uploads.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, vec!["1 good.png"]);

    let index = build_index(uploads);
    assert_eq!(index.get(1).map(|p| p.bytes().to_vec()), Some(valid));
}

#[test]
fn test_remote_fetch_skips_non_urls() {
    let fetcher = RemoteFetcher::new(std::time::Duration::from_secs(1)).unwrap();

    assert!(matches!(fetcher.fetch(""), ImageResolution::Skipped(_)));
    assert!(matches!(
        fetcher.fetch("a watercolor of a drone"),
        ImageResolution::Skipped(_)
    ));
    assert!(matches!(fetcher.fetch("ftp://host/a.png"), ImageResolution::Skipped(_)));
}

#[test]
fn test_remote_fetch_malformed_url_fails_softly() {
    let fetcher = RemoteFetcher::new(std::time::Duration::from_secs(1)).unwrap();

    assert!(matches!(
        fetcher.fetch("http//missing-colon"),
        ImageResolution::Failed(_)
    ));
}

// Generative resolver and pipeline

#[test]
fn test_should_generate_policy() {
    assert!(should_generate("a drone", false, 0));
    assert!(!should_generate("a drone", false, 1));
    assert!(!should_generate("a drone", false, 7));
    assert!(!should_generate("", false, 0));

    assert!(should_generate("a drone", true, 0));
    assert!(should_generate("a drone", true, 5));
    assert!(!should_generate("", true, 5));
}

#[test]
fn test_generative_first_slide_only() {
    let loader = FakeLoader::new(vec![]);
    let calls = Arc::clone(&loader.generate_calls);
    let pipeline = GenerativePipeline::new(loader);

    let records = vec![
        record("A", &["x"], "a drone over a city"),
        record("B", &["y"], "an operator at a console"),
        record("C", &[], "a warehouse"),
    ];
    let mode = DeckMode::Generative(GenerativeInputs {
        pipeline: &pipeline,
        steps: 10,
        per_slide_images: false,
        progress: None,
    });
    let assembled = assemble_deck(&records, mode, "AI deck").expect("Build should succeed");

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        assembled.outcomes,
        vec![ImageOutcome::Attached, ImageOutcome::Skipped, ImageOutcome::Skipped]
    );
    let slides = assembled.deck.slides();
    assert_eq!(slides[1].pictures().count(), 1);
    assert_eq!(slides[2].pictures().count(), 0);
    assert_eq!(slides[3].pictures().count(), 0);
}

#[test]
fn test_generative_per_slide_images() {
    let loader = FakeLoader::new(vec![]);
    let calls = Arc::clone(&loader.generate_calls);
    let pipeline = GenerativePipeline::new(loader);

    let records = vec![
        record("A", &[], "first prompt"),
        record("B", &[], ""),
        record("C", &[], "third prompt"),
    ];
    let mode = DeckMode::Generative(GenerativeInputs {
        pipeline: &pipeline,
        steps: 10,
        per_slide_images: true,
        progress: None,
    });
    let assembled = assemble_deck(&records, mode, "AI deck").unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(
        assembled.outcomes,
        vec![ImageOutcome::Attached, ImageOutcome::Skipped, ImageOutcome::Attached]
    );
}

#[test]
fn test_generation_failure_is_contained_to_its_slide() {
    let mut loader = FakeLoader::new(vec![]);
    loader.fail_on = Some("cursed prompt".to_string());
    let pipeline = GenerativePipeline::new(loader);

    let records = vec![
        record("A", &["x"], "cursed prompt"),
        record("B", &["y"], "fine prompt"),
    ];
    let mode = DeckMode::Generative(GenerativeInputs {
        pipeline: &pipeline,
        steps: 10,
        per_slide_images: true,
        progress: None,
    });
    let built = build_deck(&records, mode, "AI deck").expect("Build should not abort");

    assert_eq!(built.slide_count, 3);
    assert!(matches!(built.outcomes[0], ImageOutcome::Failed(_)));
    assert_eq!(built.outcomes[1], ImageOutcome::Attached);
    assert_eq!(built.images_attached(), 1);
    assert_eq!(built.image_failures(), 1);
}

#[test]
fn test_generative_resolver_encodes_png() {
    let backend: Arc<dyn ImageBackend> = Arc::new(SolidBackend {
        calls: Arc::new(AtomicUsize::new(0)),
        fail_on: None,
    });
    let mut resolver = GenerativeResolver::new(backend, 5, false, None);

    let resolution = resolver.resolve(SlideSlot { index: 0, total: 1 }, &record("A", &[], "p"));
    let payload = resolution.into_payload().expect("Image should be generated");

    assert_eq!(payload.extension(), "png");
    assert_eq!(payload.dimensions(), (8, 6));
}

#[test]
fn test_progress_reported_before_each_slide() {
    let pipeline = GenerativePipeline::new(FakeLoader::new(vec![]));
    let records = vec![
        record("A", &[], "a very long prompt describing a delivery drone at dawn"),
        record("B", &[], ""),
    ];

    let mut seen: Vec<(f64, String)> = Vec::new();
    let mut record_progress = |fraction: f64, message: &str| {
        seen.push((fraction, message.to_string()));
    };
    let callback: &mut dyn FnMut(f64, &str) = &mut record_progress;
    let mode = DeckMode::Generative(GenerativeInputs {
        pipeline: &pipeline,
        steps: 10,
        per_slide_images: false,
        progress: Some(callback),
    });
    assemble_deck(&records, mode, "AI deck").unwrap();

    assert_eq!(
        seen,
        vec![
            (
                0.0,
                "Generating visual 1/2: a very long prompt describing ...".to_string()
            ),
            (0.5, "Generating visual 2/2: ...".to_string()),
        ]
    );
}

#[test]
fn test_progress_message_truncates_by_characters() {
    let slot = SlideSlot { index: 2, total: 4 };
    let message = progress_message(slot, "éléphant rose volant au-dessus de Paris");

    assert_eq!(message, "Generating visual 3/4: éléphant rose volant au-dessus...");
}

#[test]
fn test_pipeline_prefers_accelerator() {
    let loader = FakeLoader::new(vec![]);
    let attempts = Arc::clone(&loader.attempts);
    let pipeline = GenerativePipeline::new(loader);

    pipeline.ensure().expect("Pipeline should load");

    assert_eq!(pipeline.profile(), Some(DeviceProfile::PREFERRED));
    let attempts = attempts.lock();
    assert_eq!(attempts.len(), 1);
    let (_, options) = attempts[0];
    assert!(options.attention_slicing);
    assert!(!options.safety_checker);
}

#[test]
fn test_pipeline_falls_back_to_cpu() {
    let loader = FakeLoader::new(vec![Device::Accelerator]);
    let attempts = Arc::clone(&loader.attempts);
    let pipeline = GenerativePipeline::new(loader);

    pipeline.ensure().expect("CPU fallback should load");

    assert_eq!(pipeline.profile(), Some(DeviceProfile::FALLBACK));
    let profiles: Vec<DeviceProfile> = attempts.lock().iter().map(|(p, _)| *p).collect();
    assert_eq!(profiles, vec![DeviceProfile::PREFERRED, DeviceProfile::FALLBACK]);
}

#[test]
fn test_pipeline_skips_missing_accelerator() {
    let mut loader = FakeLoader::new(vec![]);
    loader.accelerator = false;
    let attempts = Arc::clone(&loader.attempts);
    let pipeline = GenerativePipeline::new(loader);

    pipeline.ensure().unwrap();

    let profiles: Vec<DeviceProfile> = attempts.lock().iter().map(|(p, _)| *p).collect();
    assert_eq!(profiles, vec![DeviceProfile::FALLBACK]);
}

#[test]
fn test_pipeline_initializes_at_most_once() {
    let loader = FakeLoader::new(vec![]);
    let attempts = Arc::clone(&loader.attempts);
    let pipeline = GenerativePipeline::new(loader);

    for _ in 0..3 {
        pipeline.ensure().unwrap();
    }

    assert_eq!(attempts.lock().len(), 1);
}

#[test]
fn test_unavailable_pipeline_is_not_retried() {
    let loader = FakeLoader::new(vec![Device::Accelerator, Device::Cpu]);
    let attempts = Arc::clone(&loader.attempts);
    let pipeline = GenerativePipeline::new(loader);

    assert!(matches!(pipeline.ensure(), Err(DeckError::BackendUnavailable(_))));
    assert!(matches!(pipeline.ensure(), Err(DeckError::BackendUnavailable(_))));

    assert_eq!(attempts.lock().len(), 2);
    assert_eq!(pipeline.profile(), None);
}

#[test]
fn test_generative_build_reports_unavailable_backend() {
    let pipeline = GenerativePipeline::new(FakeLoader::new(vec![Device::Accelerator, Device::Cpu]));
    let records = vec![record("A", &[], "prompt")];

    let mode = DeckMode::Generative(GenerativeInputs {
        pipeline: &pipeline,
        steps: 10,
        per_slide_images: false,
        progress: None,
    });
    let result = build_deck(&records, mode, "AI deck");

    assert!(matches!(result, Err(DeckError::BackendUnavailable(_))));
}

// Slide layout

#[test]
fn test_body_is_narrower_with_image() {
    assert!(layout::body_frame(true).cx < layout::body_frame(false).cx);

    let mut deck = Deck::new("Layout");
    let bullets = vec!["one".to_string(), "two".to_string()];
    layout::add_content_slide(&mut deck, "Same", &bullets, Some(payload(20, 10)));
    layout::add_content_slide(&mut deck, "Same", &bullets, None);

    let with_image = &deck.slides()[0];
    let without_image = &deck.slides()[1];
    assert!(body_width(with_image) < body_width(without_image));
    assert_eq!(body_width(with_image), inches(5.0));
    assert_eq!(body_width(without_image), inches(9.0));

    // The picture sits to the right of the narrow text column
    let picture = with_image.pictures().next().expect("Picture should be placed");
    let body = with_image.text_box(layout::BODY_BOX).unwrap();
    assert!(picture.frame.x >= body.frame.right());
}

#[test]
fn test_content_slide_shapes() {
    let mut deck = Deck::new("Layout");
    let bullets = vec!["first".to_string(), "second".to_string()];
    layout::add_content_slide(&mut deck, "Context", &bullets, Some(payload(200, 100)));

    let slide = &deck.slides()[0];
    let title = slide.text_box(layout::TITLE_BOX).unwrap();
    assert_eq!(title.frame, layout::title_frame());
    assert_eq!(title.paragraphs[0].text, "Context");
    assert_eq!(title.paragraphs[0].font.size_pt, layout::TITLE_SIZE_PT);
    assert!(title.paragraphs[0].font.bold);

    let body = slide.text_box(layout::BODY_BOX).unwrap();
    let texts: Vec<&str> = body.paragraphs.iter().map(|p| p.text.as_str()).collect();
    assert_eq!(texts, vec!["• first", "• second"]);
    assert!(body.word_wrap);
    for paragraph in &body.paragraphs {
        assert_eq!(paragraph.font.size_pt, layout::BULLET_SIZE_PT);
        assert_eq!(paragraph.font.typeface, "Arial");
        assert_eq!(paragraph.space_after_pt, Some(layout::BULLET_SPACE_AFTER_PT));
    }

    let picture = slide.pictures().next().unwrap();
    assert_eq!(picture.frame.x, inches(5.8));
    assert_eq!(picture.frame.y, inches(1.8));
    assert_eq!(picture.frame.cx, inches(3.8));
    assert_eq!(picture.frame.cy, inches(1.9));
}

#[test]
fn test_slide_without_bullets_keeps_empty_body() {
    let mut deck = Deck::new("Layout");
    layout::add_content_slide(&mut deck, "Only a title", &[], None);

    let slide = &deck.slides()[0];
    assert!(slide.text_box(layout::BODY_BOX).unwrap().paragraphs.is_empty());
    assert_eq!(slide.pictures().count(), 0);
}

// Deck building

#[test]
fn test_deck_has_title_slide_then_records_in_order() {
    let records = parse_outline("TITRE: One\n- a\nTITRE: Two\n- b\nTITRE: Three\n");
    let assembled = assemble_deck(&records, DeckMode::TextOnly, "My talk").unwrap();
    let slides = assembled.deck.slides();

    assert_eq!(slides.len(), 4);
    assert_eq!(slide_title(&slides[0]), "My talk");
    assert_eq!(
        slides[0].text_box(layout::SUBTITLE_BOX).unwrap().text(),
        ModeKind::TextOnly.subtitle()
    );
    let titles: Vec<String> = slides[1..].iter().map(slide_title).collect();
    assert_eq!(titles, vec!["One", "Two", "Three"]);
    assert_eq!(assembled.outcomes, vec![ImageOutcome::Skipped; 3]);
}

#[test]
fn test_text_only_build_is_idempotent() {
    let records = parse_outline("TITRE: A\n- x\n- y\nVISUEL: https://example.com/a.png\nTITRE: B\n- z\n");

    let first = assemble_deck(&records, DeckMode::TextOnly, "Deck").unwrap().deck;
    let second = assemble_deck(&records, DeckMode::TextOnly, "Deck").unwrap().deck;

    assert_eq!(first.slide_count(), second.slide_count());
    assert_eq!(first, second);
    for slide in first.slides() {
        assert_eq!(slide.pictures().count(), 0);
        if let Some(body) = slide.text_box(layout::BODY_BOX) {
            assert_eq!(body.frame.cx, inches(9.0));
        }
    }
}

#[test]
fn test_local_images_attach_by_position() {
    let index = build_index(vec![
        UploadedImage::new("02 second.png", png_bytes(30, 30, 5)),
        UploadedImage::new("cover.png", png_bytes(30, 30, 6)),
    ]);
    let records = parse_outline("TITRE: A\nTITRE: B\nTITRE: C\n");

    let assembled = assemble_deck(&records, DeckMode::LocalImages(index), "Deck").unwrap();
    let slides = assembled.deck.slides();

    assert_eq!(
        assembled.outcomes,
        vec![ImageOutcome::Skipped, ImageOutcome::Attached, ImageOutcome::Skipped]
    );
    assert_eq!(slides[2].pictures().count(), 1);
    assert_eq!(body_width(&slides[2]), inches(5.0));
    assert_eq!(body_width(&slides[1]), inches(9.0));
}

#[test]
fn test_empty_outline_builds_title_slide_only() {
    let built = build_deck(&[], DeckMode::TextOnly, "Empty").unwrap();

    assert_eq!(built.slide_count, 1);
    assert!(built.outcomes.is_empty());
    assert!(!built.bytes.is_empty());
}

// PPTX serialization

fn read_part(archive: &mut ZipArchive<Cursor<Vec<u8>>>, name: &str) -> String {
    let mut part = archive.by_name(name).expect("Part missing from package");
    let mut content = String::new();
    part.read_to_string(&mut content).unwrap();
    content
}

#[test]
fn test_pptx_package_parts() {
    let index = build_index(vec![UploadedImage::new(
        "1 photo.jpg",
        encoded_image(10, 10, 3, ImageOutputFormat::Jpeg(90)),
    )]);
    let records = parse_outline("TITRE: A\n- x\nTITRE: B\n- y\n");
    let built = build_deck(&records, DeckMode::LocalImages(index), "Deck").unwrap();

    let mut archive = ZipArchive::new(Cursor::new(built.bytes)).expect("Output should be a ZIP");
    let names: Vec<String> = archive.file_names().map(|n| n.to_string()).collect();
    for expected in [
        "[Content_Types].xml",
        "_rels/.rels",
        "docProps/app.xml",
        "docProps/core.xml",
        "ppt/presentation.xml",
        "ppt/_rels/presentation.xml.rels",
        "ppt/slideMasters/slideMaster1.xml",
        "ppt/slideLayouts/slideLayout1.xml",
        "ppt/theme/theme1.xml",
        "ppt/slides/slide1.xml",
        "ppt/slides/slide2.xml",
        "ppt/slides/slide3.xml",
        "ppt/media/image1.jpeg",
    ] {
        assert!(names.contains(&expected.to_string()), "missing {}", expected);
    }
    assert!(!names.contains(&"ppt/slides/slide4.xml".to_string()));

    let slide2 = read_part(&mut archive, "ppt/slides/slide2.xml");
    assert!(slide2.contains("<a:t>A</a:t>"));
    assert!(slide2.contains("<a:t>• x</a:t>"));
    assert!(slide2.contains(r#"r:embed="rId2""#));
    assert!(slide2.contains(&format!(r#"cx="{}""#, 5 * EMU_PER_INCH)));

    let slide3 = read_part(&mut archive, "ppt/slides/slide3.xml");
    assert!(!slide3.contains("<p:pic>"));
    assert!(slide3.contains(&format!(r#"cx="{}""#, 9 * EMU_PER_INCH)));

    let rels = read_part(&mut archive, "ppt/slides/_rels/slide2.xml.rels");
    assert!(rels.contains("../media/image1.jpeg"));

    let app = read_part(&mut archive, "docProps/app.xml");
    assert!(app.contains("<Slides>3</Slides>"));
}

#[test]
fn test_pptx_escapes_text() {
    let records = vec![record("R&D <2024>", &["\"quoted\" & more"], "")];
    let built = build_deck(&records, DeckMode::TextOnly, "Tom & Jerry").unwrap();

    let mut archive = ZipArchive::new(Cursor::new(built.bytes)).unwrap();
    let slide = read_part(&mut archive, "ppt/slides/slide2.xml");
    assert!(slide.contains("R&amp;D &lt;2024&gt;"));
    assert!(slide.contains("&quot;quoted&quot; &amp; more"));

    let core = read_part(&mut archive, "docProps/core.xml");
    assert!(core.contains("<dc:title>Tom &amp; Jerry</dc:title>"));
}

#[test]
fn test_pptx_replaces_control_characters() {
    let records = parse_outline("TITRE: Ligne\u{0B}deux\n- a\u{0C}b\n");
    let built = build_deck(&records, DeckMode::TextOnly, "Deck\u{1}title").unwrap();

    let mut archive = ZipArchive::new(Cursor::new(built.bytes)).unwrap();
    let mut parts = vec![read_part(&mut archive, "docProps/core.xml")];
    for n in 1..=2 {
        parts.push(read_part(&mut archive, &format!("ppt/slides/slide{}.xml", n)));
    }
    for part in &parts {
        let forbidden: Vec<u32> = part
            .chars()
            .filter(|c| *c < ' ' && !matches!(*c, '\t' | '\n' | '\r'))
            .map(|c| c as u32)
            .collect();
        assert!(forbidden.is_empty(), "forbidden characters {:?}", forbidden);
    }

    let slide = &parts[2];
    assert!(slide.contains("<a:t>Ligne deux</a:t>"));
    assert!(slide.contains("<a:t>• a b</a:t>"));
    assert!(slide.contains(&format!(r#"lang="{}""#, layout::TEXT_LANG)));
    assert!(parts[0].contains("<dc:title>Deck title</dc:title>"));
}

// Watch mode

fn watch_request(root: &std::path::Path) -> run::BuildRequest {
    run::BuildRequest {
        outline_path: root.join("outline.txt"),
        output_path: root.join("deck.pptx"),
        mode: ModeKind::LocalImages,
        images_dir: Some(root.join("images")),
        title: None,
        generation: GenerationConfig {
            steps: 1,
            per_slide_images: false,
        },
    }
}

#[test]
fn test_watch_relevance_includes_removed_images() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let root = utils::get_absolute_path(temp_dir.path()).unwrap();
    std::fs::write(root.join("outline.txt"), "TITRE: A\n").unwrap();
    std::fs::create_dir(root.join("images")).unwrap();
    std::fs::create_dir(root.join("elsewhere")).unwrap();
    let request = watch_request(&root);

    // Neither image exists any more: both were just removed
    assert!(watch::is_relevant_path(&root.join("images").join("2 chart.png"), &request));
    assert!(watch::is_relevant_path(&root.join("images").join("3 photo.JPG"), &request));

    assert!(watch::is_relevant_path(&root.join("outline.txt"), &request));
    assert!(!watch::is_relevant_path(&root.join("deck.pptx"), &request));
    assert!(!watch::is_relevant_path(&root.join(".deck.pptx.1234.tmp"), &request));
    assert!(!watch::is_relevant_path(&root.join("images").join("notes.txt"), &request));
    assert!(!watch::is_relevant_path(&root.join("elsewhere").join("2 chart.png"), &request));
}

// Configuration and utilities

#[test]
fn test_generation_config_overrides() {
    let config = Config::new();

    let defaults = config.get_generation_config(None, None).unwrap();
    assert_eq!(defaults.steps, 30);
    assert!(!defaults.per_slide_images);

    let custom = config.get_generation_config(Some(12), Some(true)).unwrap();
    assert_eq!(custom.steps, 12);
    assert!(custom.per_slide_images);

    assert!(matches!(
        config.get_generation_config(Some(0), None),
        Err(DeckError::ValidationError(_))
    ));
}

#[test]
fn test_write_atomically_creates_parents() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let output = temp_dir.path().join("nested").join("deck.pptx");

    utils::write_atomically(&output, b"deck bytes").unwrap();

    assert_eq!(std::fs::read(&output).unwrap(), b"deck bytes");
    let leftovers: Vec<_> = std::fs::read_dir(output.parent().unwrap())
        .unwrap()
        .flatten()
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}
