use super::sequence::RequestId;
use crate::api::VoiceAnswer;
use crate::error::SessionError;
use crate::playback::PlaybackId;

/// Something the presentation layer may want to react to
#[derive(Debug)]
pub enum SessionEvent {
    /// A typed question was answered and the answer appended to the log
    AnswerReceived { seq: RequestId, text: String },

    /// A voice question was transcribed and answered; both messages appended
    VoiceTurnCompleted { seq: RequestId, answer: VoiceAnswer },

    /// The current turn failed; nothing was appended
    RequestFailed { seq: RequestId, error: SessionError },

    /// A response arrived for a request that is no longer the latest
    StaleResponseDiscarded { seq: RequestId },

    PlaybackStarted { id: PlaybackId },

    /// Speech could not be fetched or played
    PlaybackFailed { error: SessionError },

    /// Audio played to its natural end
    PlaybackFinished { id: PlaybackId },
}
