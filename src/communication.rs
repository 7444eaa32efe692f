use std::path::PathBuf;

use uuid::Uuid;

/// one instruction for the audio thread
pub struct Message {
    pub kind: MessageType,
    pub alarm_id: Uuid,
}

impl Message {
    #[must_use]
    pub const fn new(kind: MessageType, alarm_id: Uuid) -> Self {
        Self { kind, alarm_id }
    }
}

#[derive(Debug, Clone)]
pub enum MessageType {
    /// begin looping the alert sound until stopped
    AlarmTriggered { volume: f32, sound_path: PathBuf },
    /// play the sound once, used when auditioning sounds
    Preview { volume: f32, sound_path: PathBuf },
    /// the active alert was dismissed (or its alarm removed)
    AlarmStopped,
}
