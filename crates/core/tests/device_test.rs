//! Display lists, device composition, rasterization and content extraction.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use vellum_core::device::{
    CommandKinds, CompositeDevice, ContentDevice, ContentOptions, Device, DisplayList, DrawDevice,
    ListDevice, TraceDevice,
};
use vellum_core::error::{DeviceError, Result, VellumError};
use vellum_core::geometry::{Matrix, Point, Quad, Rect};
use vellum_core::model::{
    ColorStop, FillRule, Font, GroupParams, Image, Path, Rgba, Shade, ShadeKind, Stroke, Text,
    TextSpan, Tile, WritingMode,
};
use vellum_core::ocr::{OcrEngine, OcrParams, OcrWord};
use vellum_core::page::{GlyphRun, Page, extract_pages};

fn page_rect() -> Rect {
    Rect::from_xywh(0.0, 0.0, 200.0, 100.0)
}

fn square(x: f64, y: f64, size: f64) -> Path {
    Path::from_rect(&Rect::from_xywh(x, y, size, size))
}

fn text(s: &str, x: f64, y: f64) -> Text {
    let font = Arc::new(Font::new("Mono", 0.8, -0.2));
    let mut span = TextSpan::new(font, Matrix::scale(10.0, 10.0), WritingMode::Horizontal);
    for (i, rune) in s.chars().enumerate() {
        span.push_glyph(rune, rune as u32, Point::new(x + i as f64 * 5.0, y), 0.5);
    }
    Text { spans: vec![span] }
}

fn gray(width: u32, height: u32) -> Image {
    Image::new(width, height, 1, vec![128; (width * height) as usize]).unwrap()
}

/// Drives `dev` with one call of every kind, every clip balanced.
fn draw_everything(dev: &mut dyn Device) {
    let id = Matrix::IDENTITY;
    let scissor = page_rect();
    let stroke = Stroke::with_width(2.0);
    let unit = Matrix::scale(40.0, 20.0).concat(&Matrix::translate(10.0, 10.0));
    let shade = Shade {
        kind: ShadeKind::Linear {
            start: Point::new(0.0, 0.0),
            end: Point::new(100.0, 0.0),
        },
        matrix: id,
        bounds: Rect::from_xywh(0.0, 0.0, 100.0, 50.0),
        stops: vec![
            ColorStop { offset: 0.0, color: Rgba::BLACK },
            ColorStop { offset: 1.0, color: Rgba::WHITE },
        ],
    };
    let tile = Tile {
        id: 3,
        area: scissor,
        view: Rect::from_xywh(0.0, 0.0, 10.0, 10.0),
        xstep: 10.0,
        ystep: 10.0,
        matrix: id,
    };
    let t = text("abc", 20.0, 60.0);

    dev.fill_path(&square(5.0, 5.0, 10.0), FillRule::Winding, &id, Rgba::BLACK);
    dev.stroke_path(&square(20.0, 5.0, 10.0), &stroke, &id, Rgba::BLACK);
    dev.fill_shade(&shade, &id, 0.5);
    dev.fill_image(&gray(4, 2), &unit, 1.0);
    dev.fill_image_mask(&gray(4, 2), &unit, Rgba::BLACK);
    dev.clip_path(&square(0.0, 0.0, 50.0), FillRule::EvenOdd, &id, scissor);
    dev.fill_text(&t, &id, Rgba::BLACK);
    dev.pop_clip();
    dev.clip_stroke_path(&square(0.0, 0.0, 50.0), &stroke, &id, scissor);
    dev.pop_clip();
    dev.clip_image_mask(&gray(4, 2), &unit, scissor);
    dev.pop_clip();
    dev.stroke_text(&t, &stroke, &id, Rgba::BLACK);
    dev.clip_text(&t, &id, scissor);
    dev.pop_clip();
    dev.clip_stroke_text(&t, &stroke, &id, scissor);
    dev.pop_clip();
    dev.ignore_text(&t, &id);
    dev.begin_mask(scissor, Rgba::BLACK, true);
    dev.end_mask();
    dev.begin_group(scissor, &GroupParams::default());
    dev.end_group();
    dev.begin_tile(&tile);
    dev.end_tile();
    dev.begin_layer("ink");
    dev.end_layer();
}

fn recorded() -> DisplayList {
    let mut rec = ListDevice::new(1, page_rect());
    draw_everything(&mut rec);
    rec.close();
    rec.into_list()
}

/// Counts the calls it receives; interested in text only.
#[derive(Default)]
struct TextOnly {
    calls: Vec<&'static str>,
}

impl Device for TextOnly {
    fn error(&self) -> Option<&DeviceError> {
        None
    }

    fn interests(&self) -> CommandKinds {
        CommandKinds::FILL_TEXT | CommandKinds::CLOSE
    }

    fn fill_path(&mut self, _: &Path, _: FillRule, _: &Matrix, _: Rgba) {
        self.calls.push("fill_path");
    }

    fn pop_clip(&mut self) {
        self.calls.push("pop_clip");
    }

    fn fill_text(&mut self, _: &Text, _: &Matrix, _: Rgba) {
        self.calls.push("fill_text");
    }

    fn close(&mut self) {
        self.calls.push("close");
    }
}

struct FakeOcr {
    words: Vec<OcrWord>,
    images: Arc<AtomicUsize>,
    fail: bool,
}

impl OcrEngine for FakeOcr {
    fn set_image(&mut self, encoded: &[u8]) -> Result<()> {
        assert!(encoded.starts_with(b"\x89PNG"));
        self.images.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(VellumError::Ocr("engine crashed".into()));
        }
        Ok(())
    }

    fn words(&mut self) -> Result<Vec<OcrWord>> {
        Ok(self.words.clone())
    }
}

/// A word box in pixel space, rows growing downwards.
fn ocr_word(text: &str, l: f64, t: f64, r: f64, b: f64, confidence: f64) -> OcrWord {
    OcrWord {
        text: text.into(),
        quad: Quad::new(
            Point::new(l, b),
            Point::new(l, t),
            Point::new(r, t),
            Point::new(r, b),
        ),
        start_baseline: Point::new(l, b),
        end_baseline: Point::new(r, b),
        confidence,
    }
}

fn word_texts(device: &ContentDevice) -> Vec<String> {
    let mut texts: Vec<String> = device
        .content()
        .blocks
        .iter()
        .flat_map(|b| b.words().map(|w| w.text.clone()))
        .collect();
    texts.sort();
    texts
}

// ============================================================================
// Display lists
// ============================================================================

#[test]
fn list_records_every_kind() {
    let list = recorded();
    assert_eq!(list.len(), 27);
    assert_eq!(list.kinds(), CommandKinds::all());
    assert!(list.is_closed());
}

#[test]
fn open_list_replays_without_closing() {
    let mut rec = ListDevice::new(1, page_rect());
    draw_everything(&mut rec);
    let open = rec.into_list();
    assert!(!open.is_closed());

    let mut again = ListDevice::new(1, page_rect());
    open.replay(&mut again).unwrap();
    again.fill_text(&text("more", 10.0, 10.0), &Matrix::IDENTITY, Rgba::BLACK);
    assert!(again.error().is_none());
    assert_eq!(again.list().len(), 27);
    assert!(!again.list().is_closed());

    let mut dev = ContentDevice::new(page_rect(), ContentOptions::default(), None);
    open.replay(&mut dev).unwrap();
    assert!(dev.content().blocks.is_empty());

    let mut dev = ContentDevice::new(page_rect(), ContentOptions::default(), None);
    open.run(&mut dev).unwrap();
    assert_eq!(dev.content().text(), "abc");
}

#[test]
fn replay_is_deterministic() {
    let list = recorded();
    let mut again = ListDevice::new(1, page_rect());
    list.run(&mut again).unwrap();
    assert_eq!(again.into_list(), list);
}

#[test]
fn json_round_trip_replays_identically() {
    let list = recorded();
    let json = list.to_json().unwrap();
    let parsed = DisplayList::from_json(json.as_bytes()).unwrap();
    assert_eq!(parsed, list);

    let mut rec = ListDevice::new(1, page_rect());
    parsed.run(&mut rec).unwrap();
    assert_eq!(rec.list(), &list);
}

#[test]
fn run_skips_uninterested_kinds() {
    let mut dev = TextOnly::default();
    recorded().run(&mut dev).unwrap();
    assert_eq!(dev.calls, ["fill_text", "close"]);
}

#[test]
fn trace_device_balances_nesting() {
    let mut trace = TraceDevice::new();
    recorded().run(&mut trace).unwrap();
    assert_eq!(trace.depth(), 0);
    assert_eq!(trace.calls(), 27);
}

// ============================================================================
// Composite
// ============================================================================

#[test]
fn composite_filters_per_child() {
    let mut rec = ListDevice::new(1, page_rect());
    let mut text_only = TextOnly::default();
    {
        let mut composite = CompositeDevice::new(vec![&mut rec as &mut dyn Device, &mut text_only]);
        assert_eq!(composite.len(), 2);
        assert_eq!(composite.interests(), CommandKinds::all());
        recorded().run(&mut composite).unwrap();
    }
    assert_eq!(rec.list().len(), 27);
    assert_eq!(text_only.calls, ["fill_text", "close"]);
}

fn underflowing_list() -> DisplayList {
    let mut rec = ListDevice::new(1, page_rect());
    rec.fill_path(&square(0.0, 0.0, 10.0), FillRule::Winding, &Matrix::IDENTITY, Rgba::BLACK);
    rec.pop_clip();
    rec.fill_text(&text("x", 10.0, 10.0), &Matrix::IDENTITY, Rgba::BLACK);
    rec.into_list()
}

#[test]
fn failed_child_does_not_stop_siblings() {
    let list = underflowing_list();
    let mut draw = DrawDevice::for_page(page_rect(), 1.0, Rgba::WHITE).unwrap();
    let mut rec = ListDevice::new(1, page_rect());
    {
        let mut composite = CompositeDevice::new(vec![&mut draw as &mut dyn Device, &mut rec]);
        list.run(&mut composite).unwrap();
        assert!(composite.error().is_none());
    }
    assert_eq!(draw.error(), Some(&DeviceError::ClipUnderflow));
    // Three replayed commands plus the close sent to the open list.
    assert_eq!(rec.list().len(), 4);
    assert!(rec.list().is_closed());
}

#[test]
fn fail_fast_composite_stops_at_first_error() {
    let list = underflowing_list();
    let mut draw = DrawDevice::for_page(page_rect(), 1.0, Rgba::WHITE).unwrap();
    let mut rec = ListDevice::new(1, page_rect());
    {
        let mut composite =
            CompositeDevice::new(vec![&mut draw as &mut dyn Device, &mut rec]).fail_fast(true);
        let err = list.run(&mut composite).unwrap_err();
        assert!(matches!(err, VellumError::Device(DeviceError::ClipUnderflow)));
    }
    assert_eq!(rec.list().len(), 1);
}

// ============================================================================
// Draw device
// ============================================================================

#[test]
fn draw_replays_everything() {
    let mut draw = DrawDevice::for_page(page_rect(), 2.0, Rgba::WHITE).unwrap();
    recorded().run(&mut draw).unwrap();
    assert_eq!((draw.width(), draw.height()), (400, 200));
    assert_eq!(draw.clip_depth(), 0);
    assert!(draw.error().is_none());
    let png = draw.encode_png().unwrap();
    assert_eq!(&png[1..4], b"PNG");
}

#[test]
fn clip_underflow_stops_replay() {
    let mut draw = DrawDevice::for_page(page_rect(), 1.0, Rgba::WHITE).unwrap();
    let err = underflowing_list().run(&mut draw).unwrap_err();
    assert!(matches!(err, VellumError::Device(DeviceError::ClipUnderflow)));
}

#[test]
fn page_render_paints_filled_square() {
    let mut page = Page::new(1, page_rect());
    let mut rec = ListDevice::new(1, page_rect());
    rec.fill_path(&square(0.0, 0.0, 10.0), FillRule::Winding, &Matrix::IDENTITY, Rgba::BLACK);
    page.list = rec.into_list();

    let pixmap = page.render(&Default::default()).unwrap().into_pixmap();
    // Page y-up: the square sits in the bottom-left corner of the raster.
    let bottom_left = pixmap.pixel(5, 95).unwrap();
    let top_left = pixmap.pixel(5, 5).unwrap();
    assert_eq!((bottom_left.red(), bottom_left.alpha()), (0, 255));
    assert_eq!(top_left.red(), 255);
}

// ============================================================================
// Content device
// ============================================================================

#[test]
fn content_collects_text_paths_and_images() {
    let mut dev = ContentDevice::new(page_rect(), ContentOptions::default(), None);
    recorded().run(&mut dev).unwrap();
    let content = dev.content();
    assert_eq!(content.paths.len(), 1);
    assert_eq!(content.strokes.len(), 1);
    assert_eq!(content.images.len(), 1);
    // fill_text only; stroke/clip/ignore text is not content.
    assert_eq!(content.text(), "abc");
}

#[test]
fn content_device_maps_image_ocr_words() {
    let images = Arc::new(AtomicUsize::new(0));
    let engine = FakeOcr {
        words: vec![
            ocr_word("scan", 10.0, 20.0, 60.0, 30.0, 90.0),
            ocr_word("smudge", 70.0, 20.0, 95.0, 30.0, 40.0),
        ],
        images: Arc::clone(&images),
        fail: false,
    };
    let options = ContentOptions {
        ocr: Some(OcrParams::default()),
        ..ContentOptions::default()
    };
    let bounds = Rect::from_xywh(0.0, 0.0, 612.0, 792.0);
    let mut dev = ContentDevice::new(bounds, options, Some(Box::new(engine)));

    // 100x50 image placed on 50..250 x 300..400.
    let ctm = Matrix::scale(200.0, 100.0).concat(&Matrix::translate(50.0, 300.0));
    dev.fill_image(&gray(100, 50), &ctm, 1.0);
    dev.fill_text(&text("cat", 100.0, 700.0), &Matrix::IDENTITY, Rgba::BLACK);
    dev.close();

    assert_eq!(images.load(Ordering::SeqCst), 1);
    assert_eq!(word_texts(&dev), ["cat", "scan"]);

    let scan = dev
        .content()
        .blocks
        .iter()
        .flat_map(|b| b.words())
        .find(|w| w.text == "scan")
        .unwrap();
    assert!(scan.quad.approx_eq(&Quad::from_ltrb(70.0, 340.0, 170.0, 360.0), 1e-9));
    assert_eq!(scan.confidence, 90.0);
}

#[test]
fn ocr_failure_keeps_vector_text() {
    let images = Arc::new(AtomicUsize::new(0));
    let engine = FakeOcr {
        words: vec![ocr_word("scan", 10.0, 20.0, 60.0, 30.0, 90.0)],
        images: Arc::clone(&images),
        fail: true,
    };
    let options = ContentOptions {
        ocr: Some(OcrParams::default()),
        ..ContentOptions::default()
    };
    let mut dev = ContentDevice::new(page_rect(), options, Some(Box::new(engine)));
    dev.fill_image(&gray(100, 50), &Matrix::scale(50.0, 25.0), 1.0);
    dev.fill_text(&text("cat", 100.0, 60.0), &Matrix::IDENTITY, Rgba::BLACK);
    dev.close();

    assert_eq!(images.load(Ordering::SeqCst), 1);
    assert!(dev.error().is_none());
    assert_eq!(word_texts(&dev), ["cat"]);
}

#[test]
fn small_images_skip_ocr() {
    let images = Arc::new(AtomicUsize::new(0));
    let engine = FakeOcr {
        words: Vec::new(),
        images: Arc::clone(&images),
        fail: false,
    };
    let options = ContentOptions {
        ocr: Some(OcrParams {
            min_image_size: Point::new(64.0, 64.0),
            ..OcrParams::default()
        }),
        ..ContentOptions::default()
    };
    let mut dev = ContentDevice::new(page_rect(), options, Some(Box::new(engine)));
    dev.fill_image(&gray(100, 50), &Matrix::IDENTITY, 1.0);
    dev.close();
    assert_eq!(images.load(Ordering::SeqCst), 0);
    assert_eq!(dev.content().images.len(), 1);
}

#[test]
fn area_ocr_maps_back_to_page_space() {
    let images = Arc::new(AtomicUsize::new(0));
    // Crop pixels are upscaled 4x: this box is 10..50 x 10..20 in the crop.
    let engine = FakeOcr {
        words: vec![ocr_word("area", 40.0, 40.0, 200.0, 80.0, 95.0)],
        images: Arc::clone(&images),
        fail: false,
    };
    let options = ContentOptions {
        ocr: Some(OcrParams {
            areas: vec![Rect::from_xywh(20.0, 10.0, 50.0, 30.0)],
            ..OcrParams::default()
        }),
        ..ContentOptions::default()
    };
    let mut dev = ContentDevice::new(page_rect(), options, Some(Box::new(engine)));
    dev.fill_path(&square(25.0, 15.0, 5.0), FillRule::Winding, &Matrix::IDENTITY, Rgba::BLACK);
    dev.close();

    assert_eq!(images.load(Ordering::SeqCst), 1);
    let words: Vec<_> = dev.content().blocks.iter().flat_map(|b| b.words()).collect();
    assert_eq!(words.len(), 1);
    assert!(words[0].quad.approx_eq(&Quad::from_ltrb(30.0, 20.0, 70.0, 30.0), 1e-9));
}

#[test]
fn oversized_area_upscale_is_skipped() {
    let images = Arc::new(AtomicUsize::new(0));
    let engine = FakeOcr {
        words: vec![ocr_word("area", 40.0, 40.0, 200.0, 80.0, 95.0)],
        images: Arc::clone(&images),
        fail: false,
    };
    let options = ContentOptions {
        ocr: Some(OcrParams {
            areas: vec![Rect::from_xywh(20.0, 10.0, 50.0, 30.0)],
            upscale: u32::MAX,
            ..OcrParams::default()
        }),
        ..ContentOptions::default()
    };
    let mut dev = ContentDevice::new(page_rect(), options, Some(Box::new(engine)));
    dev.fill_text(&text("cat", 100.0, 60.0), &Matrix::IDENTITY, Rgba::BLACK);
    dev.close();

    assert_eq!(images.load(Ordering::SeqCst), 0);
    assert!(dev.error().is_none());
    assert_eq!(word_texts(&dev), ["cat"]);
}

#[test]
fn second_close_is_ignored() {
    let mut dev = ContentDevice::new(page_rect(), ContentOptions::default(), None);
    dev.fill_text(&text("cat", 10.0, 50.0), &Matrix::IDENTITY, Rgba::BLACK);
    dev.close();
    dev.fill_text(&text("dog", 10.0, 20.0), &Matrix::IDENTITY, Rgba::BLACK);
    dev.close();
    assert_eq!(dev.content().text(), "cat");
}

// ============================================================================
// Pages
// ============================================================================

#[test]
fn pages_extract_in_parallel_with_own_engines() {
    let created = Arc::new(AtomicUsize::new(0));
    let images = Arc::new(AtomicUsize::new(0));
    let factory = {
        let created = Arc::clone(&created);
        let images = Arc::clone(&images);
        move || -> Result<Box<dyn OcrEngine>> {
            created.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeOcr {
                words: Vec::new(),
                images: Arc::clone(&images),
                fail: false,
            }))
        }
    };

    let fonts = vellum_core::model::FontCache::new();
    let pages: Vec<Page> = ["one", "two", "three", "four"]
        .iter()
        .enumerate()
        .map(|(i, word)| {
            let run = GlyphRun {
                text: word.to_string(),
                x: 10.0,
                y: 50.0,
                size: 10.0,
                font: "Mono".into(),
                advance: 0.5,
            };
            Page::from_runs(i + 1, page_rect(), &[run], &fonts)
        })
        .collect();

    let options = ContentOptions {
        ocr: Some(OcrParams::default()),
        ..ContentOptions::default()
    };
    let contents = extract_pages(&pages, &options, Some(&factory)).unwrap();
    let texts: Vec<String> = contents.iter().map(|c| c.text()).collect();
    assert_eq!(texts, ["one", "two", "three", "four"]);
    assert_eq!(created.load(Ordering::SeqCst), 4);
    assert_eq!(images.load(Ordering::SeqCst), 0);
}
