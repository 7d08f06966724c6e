mod common;

use mediamux_engine::catalog::{Catalog, Quality};
use mediamux_engine::error::SelectionError;
use mediamux_engine::selection::{ConvertSelection, DownloadSelection};
use proptest::prelude::*;
use std::path::PathBuf;

fn quality_strategy() -> impl Strategy<Value = Quality> {
    prop_oneof![
        Just(Quality::High),
        Just(Quality::Medium),
        Just(Quality::Low),
        Just(Quality::Custom),
    ]
}

fn ready_selection(catalog: &Catalog, container: &str) -> ConvertSelection {
    let mut selection = ConvertSelection::default();
    selection.set_source(PathBuf::from("/media/input.mkv"));
    selection.set_destination(PathBuf::from("/media/out"));
    selection.choose_container(catalog, container);
    selection
}

/// Applying any sequence of presets ending in `q` resolves to exactly the
/// same values as applying `q` directly: idempotent and order-independent
/// per final selection.
#[test]
fn property_preset_application_is_order_independent() {
    proptest!(|(
        history in prop::collection::vec(quality_strategy(), 0..6),
        last in prop_oneof![Just(Quality::High), Just(Quality::Medium), Just(Quality::Low)],
    )| {
        let catalog = Catalog::builtin();

        let mut meandering = ready_selection(&catalog, "mp4");
        for quality in &history {
            meandering.choose_quality(&catalog, *quality);
        }
        meandering.choose_quality(&catalog, last);

        let mut direct = ready_selection(&catalog, "mp4");
        direct.choose_quality(&catalog, last);

        let resolved_meandering = meandering.resolve(&catalog).unwrap();
        let resolved_direct = direct.resolve(&catalog).unwrap();

        let video_m = resolved_meandering.video.as_ref().unwrap();
        let video_d = resolved_direct.video.as_ref().unwrap();
        prop_assert_eq!(&video_m.bitrate, &video_d.bitrate);
        prop_assert_eq!(&video_m.resolution, &video_d.resolution);
        prop_assert_eq!(&resolved_meandering.audio.bitrate, &resolved_direct.audio.bitrate);
        prop_assert_eq!(&resolved_meandering.audio.sample_rate, &resolved_direct.audio.sample_rate);
    });
}

/// Choosing a container always lands on that container's deterministic
/// default codec and engine, regardless of what was selected before.
#[test]
fn property_container_choice_resets_to_catalog_defaults() {
    proptest!(|(
        previous_codec in prop::sample::select(vec!["h264", "hevc", "av1"]),
        container in prop::sample::select(vec!["mp4", "mkv"]),
    )| {
        let catalog = Catalog::builtin();
        let mut selection = ConvertSelection::default();
        selection.choose_container(&catalog, "mkv");
        selection.choose_video_codec(&catalog, previous_codec);

        selection.choose_container(&catalog, container);
        prop_assert_eq!(selection.video_codec.as_deref(), Some("h264"));
        prop_assert_eq!(selection.video_engine.as_deref(), Some("libx264"));
        prop_assert_eq!(selection.audio_codec.as_deref(), Some("aac"));
        prop_assert_eq!(selection.audio_engine.as_deref(), Some("aac"));
    });
}

#[test]
fn test_codec_choice_resets_engine_to_first_of_codec() {
    let catalog = Catalog::builtin();
    let mut selection = ready_selection(&catalog, "mp4");

    selection.choose_video_engine("h264_nvenc");
    assert_eq!(selection.video_engine.as_deref(), Some("h264_nvenc"));

    selection.choose_video_codec(&catalog, "hevc");
    assert_eq!(selection.video_engine.as_deref(), Some("libx265"));

    selection.choose_audio_codec(&catalog, "opus");
    assert_eq!(selection.audio_engine.as_deref(), Some("libopus"));
}

/// Switching from a video container to an audio container clears the video
/// codec/engine entirely; the resolved spec carries no video parameters.
#[test]
fn test_audio_container_resolves_without_video_fields() {
    let catalog = Catalog::builtin();
    let mut selection = ready_selection(&catalog, "mp4");
    assert!(selection.video_codec.is_some());

    selection.choose_container(&catalog, "mp3");
    assert_eq!(selection.video_codec, None);
    assert_eq!(selection.video_engine, None);

    let resolved = selection.resolve(&catalog).unwrap();
    assert!(resolved.video.is_none());
    assert_eq!(resolved.audio.codec, "aac");
}

/// Requirements are checked in fixed order: source, then format, then
/// destination.
#[test]
fn test_validation_order() {
    let catalog = Catalog::builtin();
    let mut selection = ConvertSelection::default();
    assert_eq!(selection.resolve(&catalog), Err(SelectionError::MissingSource));

    selection.set_source(PathBuf::from("/media/a.mkv"));
    assert_eq!(selection.resolve(&catalog), Err(SelectionError::MissingFormat));

    selection.choose_container(&catalog, "mp4");
    assert_eq!(selection.resolve(&catalog), Err(SelectionError::MissingDestination));

    selection.set_destination(PathBuf::from("/media/out"));
    assert!(selection.resolve(&catalog).is_ok());
}

#[test]
fn test_unknown_container_is_a_resolution_error() {
    let catalog = Catalog::builtin();
    let mut selection = ConvertSelection::default();
    selection.set_source(PathBuf::from("/media/a.mkv"));
    selection.set_destination(PathBuf::from("/media/out"));
    selection.choose_container(&catalog, "ogg");

    match selection.resolve(&catalog) {
        Err(SelectionError::Resolution(message)) => assert!(message.contains("ogg")),
        other => panic!("expected resolution error, got {:?}", other),
    }
}

#[test]
fn test_engine_not_belonging_to_codec_is_rejected() {
    let catalog = Catalog::builtin();
    let mut selection = ready_selection(&catalog, "mp4");
    selection.choose_video_codec(&catalog, "av1");
    selection.choose_video_engine("h264_nvenc");

    assert!(matches!(
        selection.resolve(&catalog),
        Err(SelectionError::Resolution(_))
    ));
}

/// Converting a.mkv to medium-quality mp4 resolves to the medium preset's
/// exact values.
#[test]
fn test_medium_quality_mp4_scenario() {
    let catalog = Catalog::builtin();
    let mut selection = ConvertSelection::default();
    selection.set_source(PathBuf::from("a.mkv"));
    selection.choose_container(&catalog, "mp4");
    selection.set_destination(PathBuf::from("/media/out"));
    selection.choose_quality(&catalog, Quality::Medium);

    let resolved = selection.resolve(&catalog).unwrap();
    let video = resolved.video.as_ref().unwrap();
    assert_eq!(video.bitrate, "2500k");
    assert_eq!(video.resolution, "1280x720");
    assert_eq!(resolved.audio.bitrate, "192k");
    assert_eq!(resolved.audio.sample_rate, "44100");
    assert_eq!(resolved.container, "mp4");
}

/// Custom quality keeps whatever the user typed, including the resolution
/// seeded from the probed file.
#[test]
fn test_custom_quality_preserves_user_fields() {
    let catalog = Catalog::builtin();
    let mut selection = ready_selection(&catalog, "mp4");
    selection.choose_quality(&catalog, Quality::Custom);
    selection.video_bitrate = "3333k".to_string();
    selection.resolution = "1920x800".to_string();
    selection.sample_rate = "96000".to_string();

    let resolved = selection.resolve(&catalog).unwrap();
    let video = resolved.video.as_ref().unwrap();
    assert_eq!(video.bitrate, "3333k");
    assert_eq!(video.resolution, "1920x800");
    assert_eq!(resolved.audio.sample_rate, "96000");
}

#[test]
fn test_metadata_seeds_resolution() {
    let catalog = Catalog::builtin();
    let mut selection = ready_selection(&catalog, "mp4");
    selection.apply_metadata(&mediamux_engine::Metadata {
        width: Some(1280),
        height: Some(532),
        ..Default::default()
    });
    assert_eq!(selection.resolution, "1280x532");
}

#[test]
fn test_download_validation_order_and_defaults() {
    let mut selection = DownloadSelection::default();
    assert_eq!(selection.audio_quality, "192");
    assert_eq!(selection.video_quality, "1080");
    assert_eq!(selection.container, "mp4");

    assert_eq!(selection.resolve(), Err(SelectionError::MissingSource));

    selection.set_url("  https://example.com/watch?v=1  ");
    assert_eq!(selection.resolve(), Err(SelectionError::MissingFormat));

    selection.apply_remote_info(&common::remote_info(&["137", "140"]));
    assert_eq!(selection.format_id.as_deref(), Some("137"));
    assert_eq!(selection.resolve(), Err(SelectionError::MissingDestination));

    selection.set_destination(PathBuf::from("/downloads"));
    let resolved = selection.resolve().unwrap();
    assert_eq!(resolved.url, "https://example.com/watch?v=1");
    assert_eq!(resolved.format_id, "137");
}

#[test]
fn test_blank_url_counts_as_missing() {
    let mut selection = DownloadSelection::default();
    selection.set_url("   ");
    assert_eq!(selection.resolve(), Err(SelectionError::MissingSource));
}

#[test]
fn test_remote_info_does_not_override_explicit_format() {
    let mut selection = DownloadSelection::default();
    selection.format_id = Some("18".to_string());
    selection.apply_remote_info(&common::remote_info(&["137", "140"]));
    assert_eq!(selection.format_id.as_deref(), Some("18"));
}
