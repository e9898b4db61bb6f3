// Tests for speech upload, result merging, scoring and the result store

mod common;

use anyhow::Result;
use axum::{
    body::Bytes,
    http::{header, HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use common::speech_metrics;
use interview_capture::analysis::{
    HttpSpeechAnalyzer, MissingSummary, ResultScores, ResultStore, SessionResult, SpeechAnalyzer,
    SummaryOutcome, RESULTS_SLOT,
};
use interview_capture::error::UploadError;
use interview_capture::feedback::VideoMetrics;
use interview_capture::recording::AudioBlob;
use tempfile::TempDir;

const VIDEO: VideoMetrics = VideoMetrics {
    eye_contact_score: 80.0,
    sentiment_score: 80.0,
    posture_score: 85.0,
};

fn close_to(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() < 0.01
}

// ============================================================================
// Result merging and scores
// ============================================================================

#[test]
fn test_merge_derives_duration_minutes() {
    let result = SessionResult::merge(
        "session-1",
        125,
        Utc::now(),
        speech_metrics(150.0, 3, 0.92),
        SummaryOutcome::Received(VIDEO),
    );

    assert_eq!(result.session_id(), "session-1");
    assert_eq!(result.duration_seconds(), 125);
    assert!(close_to(result.duration_minutes(), 2.083));
    assert_eq!(result.video_metrics(), Some(&VIDEO));
    assert_eq!(result.video_metrics_missing(), None);
    assert_eq!(result.speech_metrics().filler_word_count, 3);
}

#[test]
fn test_merge_without_summary_keeps_reason() -> Result<()> {
    let result = SessionResult::merge(
        "session-2",
        60,
        Utc::now(),
        speech_metrics(130.0, 0, 0.9),
        SummaryOutcome::Missing(MissingSummary::TimedOut),
    );

    assert_eq!(result.video_metrics(), None);
    assert_eq!(result.video_metrics_missing(), Some(MissingSummary::TimedOut));

    let json = serde_json::to_value(&result)?;
    assert!(json["video_metrics"].is_null());
    assert_eq!(json["video_metrics_missing"], "timed_out");
    Ok(())
}

#[test]
fn test_scores_for_typical_session() {
    let result = SessionResult::merge(
        "session-1",
        125,
        Utc::now(),
        speech_metrics(150.0, 3, 0.92),
        SummaryOutcome::Received(VIDEO),
    );

    let scores = ResultScores::compute(&result);
    assert_eq!(scores.pace_score, 100.0);
    assert!(close_to(scores.filler_words_per_minute, 1.4));
    assert!(close_to(scores.filler_score, 85.6));
    assert_eq!(scores.clarity_score, 92.0);
    assert!(close_to(scores.speech_score, 93.3));
    assert!(close_to(scores.video_score.unwrap_or_default(), 81.7));
    assert!(close_to(scores.overall_score, 88.6));
}

#[test]
fn test_scores_without_video_use_speech_only() {
    let result = SessionResult::merge(
        "session-3",
        60,
        Utc::now(),
        speech_metrics(100.0, 20, 95.0),
        SummaryOutcome::Missing(MissingSummary::ChannelClosed),
    );

    let scores = ResultScores::compute(&result);
    // 20 wpm under the range
    assert_eq!(scores.pace_score, 70.0);
    // Percent intelligibility is taken as is
    assert_eq!(scores.clarity_score, 95.0);
    // 20 fillers in one minute floors at zero
    assert_eq!(scores.filler_score, 0.0);
    assert_eq!(scores.video_score, None);
    assert_eq!(scores.overall_score, scores.speech_score);
}

// ============================================================================
// Result store
// ============================================================================

#[test]
fn test_store_save_load_clear() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = ResultStore::new(temp_dir.path());
    assert!(store.path().ends_with(format!("{}.json", RESULTS_SLOT)));
    assert!(store.load()?.is_none());

    let first = SessionResult::merge(
        "session-a",
        30,
        Utc::now(),
        speech_metrics(140.0, 1, 0.8),
        SummaryOutcome::Received(VIDEO),
    );
    store.save(&first)?;

    let second = SessionResult::merge(
        "session-b",
        45,
        Utc::now(),
        speech_metrics(120.0, 2, 0.7),
        SummaryOutcome::Missing(MissingSummary::NotConnected),
    );
    store.save(&second)?;

    // One slot: the latest result replaces the previous one
    let loaded = store.load()?.expect("result stored");
    assert_eq!(loaded, second);

    store.clear()?;
    assert!(store.load()?.is_none());
    store.clear()?;
    Ok(())
}

#[test]
fn test_store_rejects_corrupt_slot() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = ResultStore::new(temp_dir.path());
    std::fs::write(store.path(), "{ not a result")?;

    assert!(store.load().is_err());
    Ok(())
}

// ============================================================================
// HTTP speech analyzer
// ============================================================================

async fn serve(app: Router) -> Result<String> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let base = format!("http://{}", listener.local_addr()?);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(base)
}

fn blob() -> AudioBlob {
    AudioBlob {
        bytes: b"RIFF....WAVEfmt ".to_vec(),
        sample_count: 16000,
        sample_rate: 16000,
        channels: 1,
    }
}

#[tokio::test]
async fn test_analyzer_uploads_multipart_audio() -> Result<()> {
    let app = Router::new().route(
        "/analysis/speech",
        post(|headers: HeaderMap, body: Bytes| async move {
            let content_type = headers
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            let body = String::from_utf8_lossy(&body).to_string();

            let well_formed = content_type.starts_with("multipart/form-data")
                && body.contains(r#"name="audio""#)
                && body.contains(r#"filename="recording.wav""#)
                && body.contains("audio/wav");
            if !well_formed {
                return (StatusCode::BAD_REQUEST, Json(serde_json::json!({})));
            }

            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "words_per_minute": 150.0,
                    "filler_word_count": 3,
                    "speech_intelligibility": 0.92,
                    "raw_transcript": "so um I led the team",
                    "pauses": 4,
                })),
            )
        }),
    );
    let base = serve(app).await?;

    let analyzer = HttpSpeechAnalyzer::new(&format!("{}/", base), "/analysis/speech");
    assert_eq!(analyzer.url(), format!("{}/analysis/speech", base));

    let metrics = analyzer.analyze(blob()).await?;
    assert_eq!(metrics.words_per_minute, 150.0);
    assert_eq!(metrics.filler_word_count, 3);
    assert_eq!(metrics.raw_transcript, "so um I led the team");
    assert_eq!(metrics.extra.get("pauses"), Some(&serde_json::json!(4)));
    Ok(())
}

#[tokio::test]
async fn test_analyzer_reports_server_errors() -> Result<()> {
    let app = Router::new().route(
        "/analysis/speech",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "transcriber offline") }),
    );
    let base = serve(app).await?;

    let analyzer = HttpSpeechAnalyzer::new(&base, "/analysis/speech");
    match analyzer.analyze(blob()).await {
        Err(UploadError::Status { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "transcriber offline");
        }
        other => panic!("Expected a status error, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_analyzer_rejects_invalid_response() -> Result<()> {
    let app = Router::new().route("/analysis/speech", post(|| async { "<html>oops</html>" }));
    let base = serve(app).await?;

    let analyzer = HttpSpeechAnalyzer::new(&base, "/analysis/speech");
    assert!(matches!(
        analyzer.analyze(blob()).await,
        Err(UploadError::InvalidResponse(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_analyzer_reports_network_errors() -> Result<()> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let base = format!("http://{}", listener.local_addr()?);
    drop(listener);

    let analyzer = HttpSpeechAnalyzer::new(&base, "/analysis/speech");
    assert!(matches!(
        analyzer.analyze(blob()).await,
        Err(UploadError::Network(_))
    ));
    Ok(())
}
