// Tests for feedback message decoding and routing
//
// Inbound frames are decoded once at the channel and routed either to the
// live feedback subscribers or to the single pending finalize listener.

use anyhow::Result;
use interview_capture::error::SocketError;
use interview_capture::feedback::{
    ChannelCore, ChannelState, InboundMessage, LiveFeedback, LiveFeedbackState, OutboundMessage,
    VideoMetrics,
};
use tokio::sync::broadcast::error::TryRecvError;

const SUMMARY: &str = r#"{"type":"session_summary","data":{"video_metrics":{"eye_contact_score":80,"sentiment_score":80,"posture_score":85}}}"#;

fn feedback(attention: &str, sentiment: Option<&str>, posture: Option<&str>) -> LiveFeedback {
    LiveFeedback {
        attention_status: attention.to_string(),
        sentiment: sentiment.map(str::to_string),
        posture: posture.map(str::to_string),
    }
}

#[test]
fn test_outbound_wire_format() -> Result<()> {
    let frame = OutboundMessage::Video {
        frame: "data:image/jpeg;base64,AAAA".to_string(),
    };
    assert_eq!(
        serde_json::to_value(&frame)?,
        serde_json::json!({ "type": "video", "frame": "data:image/jpeg;base64,AAAA" })
    );
    assert_eq!(
        serde_json::to_value(&OutboundMessage::EndSession)?,
        serde_json::json!({ "type": "end_session" })
    );
    Ok(())
}

#[test]
fn test_decode_live_feedback() -> Result<()> {
    let message = InboundMessage::decode(
        r#"{"type":"video_feedback","feedback":{"attention_status":"Centered","sentiment":"happy"}}"#,
    )?;
    assert_eq!(
        message,
        InboundMessage::LiveFeedback {
            feedback: feedback("Centered", Some("happy"), None),
        }
    );
    Ok(())
}

#[test]
fn test_decode_session_summary() -> Result<()> {
    let message = InboundMessage::decode(SUMMARY)?;
    let InboundMessage::SessionSummary { data } = message else {
        panic!("Expected a session summary");
    };
    assert_eq!(data.video_metrics.eye_contact_score, 80.0);
    assert_eq!(data.video_metrics.posture_score, 85.0);
    Ok(())
}

#[test]
fn test_decode_rejects_malformed_frames() {
    for text in [
        "not json",
        r#"{"type":"unknown"}"#,
        r#"{"type":"video_feedback"}"#,
        r#"{"type":"session_summary","data":{}}"#,
    ] {
        assert!(InboundMessage::decode(text).is_err(), "{} should not decode", text);
    }
}

#[test]
fn test_live_state_mapping() {
    let centered = LiveFeedbackState::from_feedback(&feedback("Centered", Some("happy"), None));
    assert_eq!(centered.eye_contact, "Good");
    assert_eq!(centered.sentiment, "Happy");
    assert_eq!(centered.posture, "Good");

    let away = LiveFeedbackState::from_feedback(&feedback("Looking Away", None, None));
    assert_eq!(away.eye_contact, "Poor");
    assert_eq!(away.sentiment, "Unknown");

    let slouched = LiveFeedbackState::from_feedback(&feedback("Poor Posture", Some("NEUTRAL"), None));
    assert_eq!(slouched.eye_contact, "Unknown");
    assert_eq!(slouched.posture, "Poor");
    assert_eq!(slouched.sentiment, "Neutral");

    let explicit = LiveFeedbackState::from_feedback(&feedback("centered", None, Some("upright")));
    assert_eq!(explicit.posture, "Upright");

    for attention in ["error", "no valid frame"] {
        let unusable = LiveFeedbackState::from_feedback(&feedback(attention, None, None));
        assert_eq!(unusable.eye_contact, "Unknown");
        assert_eq!(unusable.posture, "Good");
    }
}

#[test]
fn test_live_state_is_last_write_wins() {
    let mut state = LiveFeedbackState::default();
    assert_eq!(state.eye_contact, "Unknown");
    assert_eq!(state.sentiment, "Neutral");

    state.apply(&feedback("centered", Some("happy"), None));
    state.apply(&feedback("looking away", None, None));

    // No averaging and no carry-over from the earlier message
    assert_eq!(state.eye_contact, "Poor");
    assert_eq!(state.sentiment, "Unknown");
}

#[tokio::test]
async fn test_core_routes_live_feedback_to_subscribers() -> Result<()> {
    let core = ChannelCore::new(ChannelState::Open);
    let mut live = core.subscribe_live();

    core.dispatch(r#"{"type":"video_feedback","feedback":{"attention_status":"centered"}}"#);
    core.dispatch("{ garbage");
    core.dispatch(r#"{"type":"video_feedback","feedback":{"attention_status":"looking away"}}"#);

    assert_eq!(live.recv().await?.attention_status, "centered");
    assert_eq!(live.recv().await?.attention_status, "looking away");
    assert!(matches!(live.try_recv(), Err(TryRecvError::Empty)));
    Ok(())
}

#[tokio::test]
async fn test_core_resolves_pending_summary_once() -> Result<()> {
    let core = ChannelCore::new(ChannelState::Open);
    let rx = core.install_summary_listener()?;
    assert!(core.has_pending_summary());

    core.dispatch(SUMMARY);
    assert!(!core.has_pending_summary());

    let metrics = rx.await?;
    assert_eq!(
        metrics,
        VideoMetrics {
            eye_contact_score: 80.0,
            sentiment_score: 80.0,
            posture_score: 85.0,
        }
    );

    // A second summary has no listener and is dropped
    core.dispatch(SUMMARY);
    assert!(!core.has_pending_summary());
    Ok(())
}

#[test]
fn test_core_summary_without_listener_is_dropped() {
    let core = ChannelCore::new(ChannelState::Open);
    let mut live = core.subscribe_live();

    core.dispatch(SUMMARY);

    assert!(!core.has_pending_summary());
    assert!(matches!(live.try_recv(), Err(TryRecvError::Empty)));
}

#[test]
fn test_core_allows_one_pending_finalize() -> Result<()> {
    let core = ChannelCore::new(ChannelState::Open);
    let _rx = core.install_summary_listener()?;

    assert!(matches!(
        core.install_summary_listener(),
        Err(SocketError::FinalizePending)
    ));
    Ok(())
}

#[tokio::test]
async fn test_core_close_fails_pending_finalize() -> Result<()> {
    let core = ChannelCore::new(ChannelState::Open);
    let rx = core.install_summary_listener()?;

    assert!(core.begin_close());
    assert!(!core.begin_close(), "Only the first close transitions");
    core.mark_closed();

    assert_eq!(core.state(), ChannelState::Closed);
    assert!(rx.await.is_err(), "Listener must not be left hanging");
    Ok(())
}

#[test]
fn test_core_close_from_closed_is_a_no_op() {
    let core = ChannelCore::new(ChannelState::Closed);
    assert!(!core.begin_close());
    assert_eq!(core.state(), ChannelState::Closed);
}
