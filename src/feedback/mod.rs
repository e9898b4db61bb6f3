//! Feedback channel to the remote analysis service
//!
//! Outbound: sampled video frames and the end-of-session signal.
//! Inbound: live feedback ticks and the one-shot session summary.

pub mod live;
pub mod messages;
pub mod socket;

pub use live::LiveFeedbackState;
pub use messages::{InboundMessage, LiveFeedback, OutboundMessage, SummaryData, VideoMetrics};
pub use socket::{ChannelCore, ChannelState, FeedbackChannel, FeedbackSocket};
