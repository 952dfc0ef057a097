//! Page rendering tests: classification, page order, limits and cleanup.
//!
//! PDFs go through [`common::FakeRasterizer`], which writes real image files
//! using pdftoppm's naming, so these tests do not need poppler installed.

mod common;

use common::{page_marker, FakeRasterizer, Fixture, RecordedJob};
use edgequake_ocr::config::{ImageFormat, RenderOverrides};
use edgequake_ocr::pipeline::encode::decode_data_uri;
use edgequake_ocr::Pdftoppm;
use std::sync::Arc;

fn request(max_pages: u32, format: ImageFormat, dpi: u32) -> RenderOverrides {
    RenderOverrides {
        max_pages: Some(max_pages),
        image_format: Some(format),
        dpi: Some(dpi),
    }
}

// ── Images ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn image_document_is_a_single_page_with_its_own_media_type() {
    let fx = Fixture::new();
    let bytes: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
    fx.add("photo.gif", &bytes);
    let rasterizer = Arc::new(FakeRasterizer::new(3));

    let pages = fx
        .renderer(rasterizer.clone())
        .render("photo.gif", &request(5, ImageFormat::Png, 150))
        .await;

    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].ordinal, 0);
    assert_eq!(pages[0].media_type, "image/gif");
    let (mime, decoded) = decode_data_uri(&pages[0].payload).expect("data uri");
    assert_eq!(mime, "image/gif");
    assert_eq!(decoded, bytes);

    assert!(rasterizer.jobs().is_empty(), "images skip the rasterizer");
    assert!(fx.downloads_removed());
    assert!(fx.scratch_is_empty());
}

// ── PDFs ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn pdf_pages_are_capped_and_ordered() {
    let fx = Fixture::new();
    fx.add_pdf("three.pdf");
    let rasterizer = Arc::new(FakeRasterizer::new(3));

    let pages = fx
        .renderer(rasterizer.clone())
        .render("three.pdf", &request(2, ImageFormat::Png, 150))
        .await;

    assert_eq!(pages.len(), 2);
    for (i, page) in pages.iter().enumerate() {
        assert_eq!(page.ordinal, i);
        assert_eq!(page.media_type, "image/png");
        assert!(page.payload.starts_with("data:image/png;base64,"));
        assert_eq!(page_marker(&page.payload), i as u8 + 1);
    }

    let jobs = rasterizer.jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(
        jobs[0],
        RecordedJob {
            input: jobs[0].input.clone(),
            format: ImageFormat::Png,
            first_page: 1,
            last_page: 2,
            dpi: 150,
        }
    );
    assert!(!jobs[0].input.exists(), "downloaded copy must be deleted");
    assert!(fx.scratch_is_empty());
}

#[tokio::test]
async fn pdf_pages_sort_numerically_not_lexicographically() {
    let fx = Fixture::new();
    fx.add_pdf("long.pdf");
    let rasterizer = Arc::new(FakeRasterizer::new(12));

    let pages = fx
        .renderer(rasterizer)
        .render("long.pdf", &request(50, ImageFormat::Png, 100))
        .await;

    let markers: Vec<u8> = pages.iter().map(|p| page_marker(&p.payload)).collect();
    assert_eq!(markers, (1..=12).collect::<Vec<u8>>());
    assert!(fx.scratch_is_empty());
}

#[tokio::test]
async fn zero_padded_names_keep_page_order() {
    let fx = Fixture::new();
    fx.add_pdf("padded.pdf");
    let mut rasterizer = FakeRasterizer::new(11);
    rasterizer.zero_pad = true;

    let pages = fx
        .renderer(Arc::new(rasterizer))
        .render("padded.pdf", &request(11, ImageFormat::Png, 150))
        .await;

    let markers: Vec<u8> = pages.iter().map(|p| page_marker(&p.payload)).collect();
    assert_eq!(markers, (1..=11).collect::<Vec<u8>>());
}

#[tokio::test]
async fn unnumbered_output_sorts_first_and_foreign_files_are_ignored() {
    let fx = Fixture::new();
    fx.add_pdf("odd.pdf");
    let mut rasterizer = FakeRasterizer::new(2);
    rasterizer.extra_files = vec!["page-cover.png".into(), "preview-1.png".into()];

    let pages = fx
        .renderer(Arc::new(rasterizer))
        .render("odd.pdf", &request(2, ImageFormat::Png, 150))
        .await;

    let markers: Vec<u8> = pages.iter().map(|p| page_marker(&p.payload)).collect();
    assert_eq!(markers, vec![0, 1, 2]);
    assert!(fx.scratch_is_empty());
}

#[tokio::test]
async fn max_pages_beyond_document_is_not_an_error() {
    let fx = Fixture::new();
    fx.add_pdf("short.pdf");

    let pages = fx
        .renderer(Arc::new(FakeRasterizer::new(2)))
        .render("short.pdf", &request(50, ImageFormat::Png, 150))
        .await;

    assert_eq!(pages.len(), 2);
}

#[tokio::test]
async fn zero_page_pdf_yields_no_pages() {
    let fx = Fixture::new();
    fx.add_pdf("empty.pdf");
    let rasterizer = Arc::new(FakeRasterizer::new(0));

    let renderer = fx.renderer(rasterizer.clone());
    let pages = renderer
        .try_render("empty.pdf", request(5, ImageFormat::Png, 150).resolve(&Default::default()))
        .await
        .expect("a PDF with no pages is not an error");

    assert!(pages.is_empty());
    assert_eq!(rasterizer.jobs().len(), 1);
    assert!(fx.downloads_removed());
    assert!(fx.scratch_is_empty());
}

#[tokio::test]
async fn jpeg_pages_are_tagged_as_jpeg() {
    let fx = Fixture::new();
    fx.add_pdf("scan.pdf");
    let rasterizer = Arc::new(FakeRasterizer::new(2));

    let pages = fx
        .renderer(rasterizer.clone())
        .render("scan.pdf", &request(2, ImageFormat::Jpeg, 300))
        .await;

    assert_eq!(pages.len(), 2);
    for page in &pages {
        assert_eq!(page.media_type, "image/jpeg");
        assert_eq!(page.format(), Some(ImageFormat::Jpeg));
        assert!(page.payload.starts_with("data:image/jpeg;base64,"));
    }
    assert_eq!(rasterizer.jobs()[0].format, ImageFormat::Jpeg);
    assert_eq!(rasterizer.jobs()[0].dpi, 300);
}

// ── Option fallbacks ─────────────────────────────────────────────────────────

#[tokio::test]
async fn unset_options_fall_back_to_renderer_defaults() {
    let fx = Fixture::new();
    fx.add_pdf("doc.pdf");

    let rasterizer = Arc::new(FakeRasterizer::new(5));
    let pages = fx
        .renderer(rasterizer.clone())
        .render("doc.pdf", &RenderOverrides::default())
        .await;
    assert_eq!(pages.len(), 1, "built-in default renders a single page");
    assert_eq!(rasterizer.jobs()[0].dpi, 150);
    assert_eq!(rasterizer.jobs()[0].format, ImageFormat::Png);

    let rasterizer = Arc::new(FakeRasterizer::new(5));
    let vision = RenderOverrides {
        max_pages: Some(3),
        image_format: Some(ImageFormat::Jpeg),
        dpi: Some(96),
    };
    let pages = fx
        .renderer(rasterizer.clone())
        .defaults(vision)
        .render("doc.pdf", &RenderOverrides::default())
        .await;
    assert_eq!(pages.len(), 3);
    assert_eq!(rasterizer.jobs()[0].format, ImageFormat::Jpeg);
    assert_eq!(rasterizer.jobs()[0].dpi, 96);
}

// ── Non-renderable input and failures ────────────────────────────────────────

#[tokio::test]
async fn plain_text_yields_no_pages() {
    let fx = Fixture::new();
    fx.add("notes.txt", b"hello");
    let rasterizer = Arc::new(FakeRasterizer::new(1));

    let renderer = fx.renderer(rasterizer.clone());
    let pages = renderer
        .try_render("notes.txt", Default::default())
        .await
        .expect("unsupported type is not an error");

    assert!(pages.is_empty());
    assert!(rasterizer.jobs().is_empty());
    assert!(fx.downloads_removed());
    assert!(fx.scratch_is_empty());
}

#[tokio::test]
async fn missing_document_yields_no_pages() {
    let fx = Fixture::new();
    let pages = fx
        .renderer(Arc::new(FakeRasterizer::new(1)))
        .render("ghost.pdf", &RenderOverrides::default())
        .await;
    assert!(pages.is_empty());
    assert!(fx.store.downloads().is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn failing_rasterizer_yields_no_pages_and_cleans_up() {
    let fx = Fixture::new();
    fx.add_pdf("broken.pdf");

    let pages = fx
        .renderer(Arc::new(Pdftoppm::new("false")))
        .render("broken.pdf", &request(2, ImageFormat::Png, 150))
        .await;

    assert!(pages.is_empty());
    assert!(fx.downloads_removed());
    assert!(fx.scratch_is_empty());
}

#[tokio::test]
async fn missing_rasterizer_binary_yields_no_pages() {
    let fx = Fixture::new();
    fx.add_pdf("doc.pdf");
    let missing = fx.root.path().join("bin/pdftoppm");

    let pages = fx
        .renderer(Arc::new(Pdftoppm::new(missing)))
        .render("doc.pdf", &request(1, ImageFormat::Png, 150))
        .await;

    assert!(pages.is_empty());
    assert!(fx.downloads_removed());
    assert!(fx.scratch_is_empty());
}
