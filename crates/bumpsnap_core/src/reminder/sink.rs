//! Notification side effects requested by the reminder scheduler.

use log::info;

/// Haptic pulse pattern in milliseconds: on, off, on.
pub const REMINDER_VIBRATION_PATTERN_MS: [u32; 3] = [200, 100, 200];

/// One sine blip of the reminder tone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneBlip {
    pub frequency_hz: f32,
    /// Offset from the start of the tone.
    pub start_ms: u32,
    pub duration_ms: u32,
    pub gain: f32,
}

/// Two rising blips, the second starting 300 ms after the first.
pub const REMINDER_TONE: [ToneBlip; 2] = [
    ToneBlip {
        frequency_hz: 880.0,
        start_ms: 0,
        duration_ms: 500,
        gain: 0.3,
    },
    ToneBlip {
        frequency_hz: 1100.0,
        start_ms: 300,
        duration_ms: 500,
        gain: 0.3,
    },
];

/// Platform collaborator rendering reminders. Calls are fire-and-forget.
pub trait NotificationSink {
    fn show_reminder(&self, week: u8);
    fn play_tone(&self);
    fn vibrate(&self, pattern_ms: &[u32]);
}

impl<T: NotificationSink + ?Sized> NotificationSink for &T {
    fn show_reminder(&self, week: u8) {
        (**self).show_reminder(week);
    }

    fn play_tone(&self) {
        (**self).play_tone();
    }

    fn vibrate(&self, pattern_ms: &[u32]) {
        (**self).vibrate(pattern_ms);
    }
}

/// Sink for headless hosts: records reminders in the log only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn show_reminder(&self, week: u8) {
        info!("event=reminder_show module=reminder status=ok week={week}");
    }

    fn play_tone(&self) {
        info!(
            "event=reminder_tone module=reminder status=ok blips={}",
            REMINDER_TONE.len()
        );
    }

    fn vibrate(&self, pattern_ms: &[u32]) {
        info!(
            "event=reminder_vibrate module=reminder status=ok pulses={}",
            pattern_ms.len()
        );
    }
}
