//! Decode/encode pipeline integration tests.
//!
//! Tests verify:
//! - Thumbnails honour the planned sample factor
//! - Sources are read once per thumbnail
//! - Corrupt sources degrade to typed errors
//! - Encoded output decodes back to the same dimensions

use std::path::Path;
use std::sync::Arc;

use raster_cache::{
    plan, Dimensions, DecodeError, ImageDecoder, ImageEncoder, ImageSource, OutputFormat,
    PixelFormat, ResourceMap, SampleFactor, SourceReader,
};

use super::test_utils::{blank_buffer, create_jpeg, create_png, is_valid_jpeg, MemoryStorage};

fn decoder_over(storage: &MemoryStorage) -> ImageDecoder {
    ImageDecoder::with_reader(SourceReader::new(Arc::new(storage.clone())))
}

// =============================================================================
// Thumbnails
// =============================================================================

#[test]
fn test_thumbnail_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("photo.jpg");
    std::fs::write(&path, create_jpeg(640, 480)).unwrap();

    let decoder = ImageDecoder::new();
    let source = ImageSource::path(&path);

    assert_eq!(decoder.probe(&source).unwrap(), Dimensions::new(640, 480));

    let thumb = decoder
        .thumbnail(&source, 160, 120, PixelFormat::LowColorNoAlpha)
        .unwrap();
    assert_eq!(thumb.dimensions(), Dimensions::new(160, 120));
    assert_eq!(thumb.byte_size(), 160 * 120 * 2);
}

#[test]
fn test_thumbnail_reads_source_once() {
    let storage = MemoryStorage::new().with_file("img/a.png", create_png(300, 200));
    let decoder = decoder_over(&storage);

    let thumb = decoder
        .thumbnail(&ImageSource::path("img/a.png"), 100, 100, PixelFormat::default())
        .unwrap();

    // 300/100 = 3 beats 200/100 = 2
    assert_eq!(thumb.dimensions(), Dimensions::new(100, 66));
    assert_eq!(storage.read_count(), 1);
}

#[test]
fn test_thumbnail_never_upsamples() {
    let decoder = ImageDecoder::new();
    let source = ImageSource::bytes(create_png(50, 40));

    let thumb = decoder
        .thumbnail(&source, 1000, 1000, PixelFormat::default())
        .unwrap();
    assert_eq!(thumb.dimensions(), Dimensions::new(50, 40));
}

#[test]
fn test_decode_matches_planned_dimensions() {
    let decoder = ImageDecoder::new();
    let source_dims = Dimensions::new(640, 480);
    let source = ImageSource::bytes(create_jpeg(source_dims.width, source_dims.height));

    let factor = plan(source_dims, 200, 200);
    assert_eq!(factor.get(), 3);

    let buffer = decoder.decode(&source, factor, PixelFormat::AlphaOnly).unwrap();
    assert_eq!(buffer.dimensions(), factor.apply(source_dims));
    assert_eq!(buffer.dimensions(), Dimensions::new(213, 160));
}

#[test]
fn test_resource_source() {
    let storage = MemoryStorage::new().with_file("res/icon.png", create_png(64, 64));
    let resources = ResourceMap::new().with("icon", ImageSource::path("res/icon.png"));
    let reader = SourceReader::new(Arc::new(storage)).with_resolver(Arc::new(resources));
    let decoder = ImageDecoder::with_reader(reader);

    let thumb = decoder
        .thumbnail(&ImageSource::resource("icon"), 16, 16, PixelFormat::LowColorWithAlpha)
        .unwrap();
    assert_eq!(thumb.dimensions(), Dimensions::new(16, 16));

    let missing = decoder.probe(&ImageSource::resource("logo"));
    assert!(matches!(missing, Err(DecodeError::NotFound(_))));
}

#[test]
fn test_concurrent_decodes() {
    let decoder = ImageDecoder::new();
    let sources: Vec<ImageSource> = (1..=4)
        .map(|i| ImageSource::bytes(create_png(40 * i, 30 * i)))
        .collect();

    std::thread::scope(|scope| {
        let handles: Vec<_> = sources
            .iter()
            .map(|source| {
                let decoder = decoder.clone();
                scope.spawn(move || decoder.thumbnail(source, 40, 30, PixelFormat::default()))
            })
            .collect();

        for handle in handles {
            let thumb = handle.join().unwrap().unwrap();
            assert!(thumb.dimensions().fits_within(40, 30));
        }
    });
}

#[test]
fn test_large_jpeg_thumbnail_within_decode_limit() {
    // 2048x2048 needs 12 MiB decoded at full size; the decoder may use 1 MiB.
    let storage = MemoryStorage::new().with_file("big.jpg", create_jpeg(2048, 2048));
    let decoder = decoder_over(&storage).with_max_decode_bytes(1024 * 1024);
    let source = ImageSource::path("big.jpg");

    let thumb = decoder
        .thumbnail(&source, 128, 128, PixelFormat::FullColorWithAlpha)
        .unwrap();
    assert_eq!(thumb.dimensions(), Dimensions::new(128, 128));

    let full = decoder.decode(&source, SampleFactor::ONE, PixelFormat::FullColorWithAlpha);
    assert!(matches!(full, Err(DecodeError::LimitExceeded(_))));
}

// =============================================================================
// Pathological Sources
// =============================================================================

#[test]
fn test_missing_file_is_not_found() {
    let decoder = ImageDecoder::new();
    let source = ImageSource::path("/nonexistent/dir/photo.jpg");

    assert!(matches!(decoder.probe(&source), Err(DecodeError::NotFound(_))));
    assert!(matches!(
        decoder.decode(&source, SampleFactor::ONE, PixelFormat::default()),
        Err(DecodeError::NotFound(_))
    ));
}

#[test]
fn test_zero_byte_file_is_unreadable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.png");
    std::fs::write(&path, b"").unwrap();

    let decoder = ImageDecoder::new();
    let result = decoder.probe(&ImageSource::path(&path));
    assert!(matches!(result, Err(DecodeError::Unreadable(_))));
}

#[test]
fn test_wrong_magic_is_unreadable() {
    let decoder = ImageDecoder::new();
    let source = ImageSource::bytes(b"GIF89a is not enabled, and this is not even a GIF".to_vec());

    let result = decoder.thumbnail(&source, 10, 10, PixelFormat::default());
    assert!(matches!(result, Err(DecodeError::Unreadable(_))));
}

#[test]
fn test_truncated_sources_fail_cleanly() {
    let decoder = ImageDecoder::new();

    let png = create_png(32, 32);
    let jpeg = create_jpeg(32, 32);

    for data in [&png[..16], &jpeg[..20]] {
        let source = ImageSource::bytes(data.to_vec());
        let result = decoder.thumbnail(&source, 8, 8, PixelFormat::default());
        assert!(matches!(result, Err(DecodeError::Unreadable(_))));
    }
}

// =============================================================================
// Re-encoding
// =============================================================================

#[test]
fn test_encode_decode_roundtrip_dimensions() {
    let decoder = ImageDecoder::new();
    let encoder = ImageEncoder::new();

    let original = decoder
        .decode(
            &ImageSource::bytes(create_png(37, 23)),
            SampleFactor::ONE,
            PixelFormat::FullColorWithAlpha,
        )
        .unwrap();

    for format in [OutputFormat::Jpeg, OutputFormat::Png] {
        let encoded = encoder.encode(&original, format, 80).unwrap();
        let decoded = decoder
            .decode(&ImageSource::bytes(encoded), SampleFactor::ONE, PixelFormat::default())
            .unwrap();
        assert_eq!(decoded.dimensions(), original.dimensions());
    }
}

#[test]
fn test_compress_reports_final_size() {
    let encoder = ImageEncoder::new();
    let buffer = blank_buffer(48, 32, PixelFormat::FullColorNoAlpha);

    let compressed = encoder.compress(&buffer, OutputFormat::Jpeg, 80).unwrap();
    assert!(is_valid_jpeg(&compressed.data));
    assert_eq!(compressed.dimensions, Dimensions::new(48, 32));
    assert_eq!(compressed.format, OutputFormat::Jpeg);
}

#[test]
fn test_lower_quality_is_not_larger() {
    let decoder = ImageDecoder::new();
    let encoder = ImageEncoder::new();
    let buffer = decoder
        .decode(
            &ImageSource::bytes(create_jpeg(128, 128)),
            SampleFactor::ONE,
            PixelFormat::FullColorNoAlpha,
        )
        .unwrap();

    let low = encoder.encode(&buffer, OutputFormat::Jpeg, 10).unwrap();
    let high = encoder.encode(&buffer, OutputFormat::Jpeg, 95).unwrap();
    assert!(low.len() <= high.len());
}

#[test]
fn test_save_then_reload_through_storage() {
    let storage = MemoryStorage::new().with_file("in.png", create_png(120, 80));
    let decoder = decoder_over(&storage);
    let encoder = ImageEncoder::new();

    let thumb = decoder
        .thumbnail(&ImageSource::path("in.png"), 60, 60, PixelFormat::FullColorWithAlpha)
        .unwrap();

    let written = encoder
        .save_to_path(&thumb, OutputFormat::Png, 80, &storage, Path::new("out/thumb.png"))
        .unwrap();
    assert_eq!(storage.file("out/thumb.png").map(|f| f.len() as u64), Some(written));

    // The thumbnail is still ours after saving.
    assert_eq!(thumb.dimensions(), Dimensions::new(60, 40));

    let reloaded = decoder.probe(&ImageSource::path("out/thumb.png")).unwrap();
    assert_eq!(reloaded, thumb.dimensions());
}
