use music_platform_converter::api::mock::{mock_track, MockProvider};
use music_platform_converter::commands;
use music_platform_converter::convert::{convert_track, TrackOutcome};
use music_platform_converter::error::ConvertError;
use music_platform_converter::registry::ProviderRegistry;
use std::sync::Arc;

fn source() -> MockProvider {
    MockProvider::new("src", "src")
        .with_track("1", "Song", &["Artist"])
        .with_track("2", "Obscure", &["Nobody"])
        .with_failing_lookup("boom")
}

fn target() -> MockProvider {
    MockProvider::new("dst", "dst").with_search_result(
        "Artist Song",
        vec![
            mock_track("dst", "best", "Song", &["Artist"]),
            mock_track("dst", "other", "Song (live)", &["Artist"]),
        ],
    )
}

#[tokio::test]
async fn converts_to_top_ranked_result() {
    let (src, dst) = (source(), target());
    let outcome = convert_track(&src, &dst, "https://src/1").await.unwrap();
    match outcome {
        TrackOutcome::Converted(track) => assert_eq!(track.url, "https://dst/best"),
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(dst.searches()[0].query, "Artist Song");
}

#[tokio::test]
async fn angle_brackets_are_stripped() {
    let (src, dst) = (source(), target());
    let outcome = convert_track(&src, &dst, "<https://src/1>").await.unwrap();
    assert!(matches!(outcome, TrackOutcome::Converted(_)));
}

#[tokio::test]
async fn foreign_url_is_invalid_and_nothing_is_searched() {
    let (src, dst) = (source(), target());
    let res = convert_track(&src, &dst, "https://elsewhere/1").await;
    assert!(matches!(res, Err(ConvertError::InvalidUrl(_))));
    assert!(dst.searches().is_empty());
}

#[tokio::test]
async fn unknown_source_track_is_source_not_found() {
    let (src, dst) = (source(), target());
    let outcome = convert_track(&src, &dst, "https://src/404").await.unwrap();
    assert_eq!(outcome, TrackOutcome::SourceNotFound);
    assert!(dst.searches().is_empty());
}

#[tokio::test]
async fn empty_search_is_no_results() {
    let (src, dst) = (source(), target());
    let outcome = convert_track(&src, &dst, "https://src/2").await.unwrap();
    assert_eq!(outcome, TrackOutcome::NoResults);
}

#[tokio::test]
async fn transport_failures_propagate() {
    let (src, dst) = (source(), target());
    let res = convert_track(&src, &dst, "https://src/boom").await;
    assert!(matches!(res, Err(ConvertError::Provider(_))));

    let dst = MockProvider::new("dst", "dst").with_failing_search("Artist Song");
    let err = convert_track(&src, &dst, "https://src/1").await.unwrap_err();
    assert!(err.to_string().contains("rate_limited"));
}

#[tokio::test]
async fn same_input_same_output() {
    let (src, dst) = (source(), target());
    let first = convert_track(&src, &dst, "https://src/1").await.unwrap();
    let second = convert_track(&src, &dst, "https://src/1").await.unwrap();
    assert_eq!(first, second);
}

fn registry() -> ProviderRegistry {
    let mut reg = ProviderRegistry::new();
    reg.register("src", Arc::new(source()));
    reg.register("dst", Arc::new(target()));
    reg
}

#[tokio::test]
async fn track_command_replies() {
    let reg = registry();
    assert_eq!(
        commands::track_convert(&reg, "SRC", "dst", "https://src/1").await.unwrap(),
        "https://dst/best"
    );
    assert_eq!(
        commands::track_convert(&reg, "nope", "dst", "https://src/1").await.unwrap(),
        commands::UNKNOWN_PLATFORM
    );
    assert_eq!(
        commands::track_convert(&reg, "src", "dst", "https://dst/best").await.unwrap(),
        commands::INVALID_URL
    );
    assert_eq!(
        commands::track_convert(&reg, "src", "dst", "https://src/404").await.unwrap(),
        commands::TRACK_NOT_FOUND
    );
    assert_eq!(
        commands::track_convert(&reg, "src", "dst", "https://src/2").await.unwrap(),
        commands::NO_RESULTS
    );
    assert!(commands::track_convert(&reg, "src", "dst", "https://src/boom").await.is_err());
}

#[tokio::test]
async fn search_command_replies() {
    let reg = registry();
    assert_eq!(
        commands::search(&reg, "dst", "Artist Song", 2).await.unwrap(),
        "https://dst/best https://dst/other"
    );
    assert_eq!(
        commands::search(&reg, "dst", "Artist Song", 0).await.unwrap(),
        "https://dst/best"
    );
    assert_eq!(
        commands::search(&reg, "dst", "nothing here", 1).await.unwrap(),
        commands::NO_RESULTS
    );
    assert_eq!(
        commands::search(&reg, "nope", "x", 1).await.unwrap(),
        "Invalid platform! Available platforms are: `src`, `dst`"
    );
}
