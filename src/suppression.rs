/// Per-channel notification suppression.
///
/// Each of the four [`NotificationChannel`]s has a `tracking` flag that is
/// read atomically on every publish. Suppressing a channel flips the flag
/// under that channel's lock, so two threads racing to suppress the same
/// channel are linearized: exactly one wins, the other gets
/// [`CollectionError::AlreadySuppressed`]. Suppression never nests.
///
/// A suppression window is represented by a [`SuppressionGuard`]. Releasing
/// it, explicitly with [`SuppressionGuard::finish`] or by dropping it on any
/// exit path, re-enables the channel and optionally emits a catch-up signal.
use crate::error::{CollectionError, CollectionResult};
use crate::event::PropertyName;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// An independently suppressible category of notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationChannel {
    /// Gates every notification.
    AllChanges,
    /// Item-changed events.
    ItemChanges,
    /// Count-change notifications.
    CountChanges,
    /// Reset events.
    Resets,
}

impl NotificationChannel {
    /// All channels.
    pub const ALL: [NotificationChannel; 4] = [
        NotificationChannel::AllChanges,
        NotificationChannel::ItemChanges,
        NotificationChannel::CountChanges,
        NotificationChannel::Resets,
    ];

    /// The flag property raised when this channel changes state.
    pub fn property_name(&self) -> PropertyName {
        match self {
            NotificationChannel::AllChanges => PropertyName::IsTrackingChanges,
            NotificationChannel::ItemChanges => PropertyName::IsTrackingItemChanges,
            NotificationChannel::CountChanges => PropertyName::IsTrackingCountChanges,
            NotificationChannel::Resets => PropertyName::IsTrackingResets,
        }
    }

    fn index(&self) -> usize {
        match self {
            NotificationChannel::AllChanges => 0,
            NotificationChannel::ItemChanges => 1,
            NotificationChannel::CountChanges => 2,
            NotificationChannel::Resets => 3,
        }
    }
}

impl fmt::Display for NotificationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationChannel::AllChanges => write!(f, "Change"),
            NotificationChannel::ItemChanges => write!(f, "Item change"),
            NotificationChannel::CountChanges => write!(f, "Count change"),
            NotificationChannel::Resets => write!(f, "Reset"),
        }
    }
}

#[derive(Debug)]
struct ChannelFlag {
    tracking: AtomicBool,
    transition: Mutex<()>,
}

impl ChannelFlag {
    fn new() -> Self {
        Self {
            tracking: AtomicBool::new(true),
            transition: Mutex::new(()),
        }
    }
}

/// Tracking flags for all four channels.
#[derive(Debug)]
pub struct Suppression {
    flags: [ChannelFlag; 4],
}

impl Default for Suppression {
    fn default() -> Self {
        Self::new()
    }
}

impl Suppression {
    /// All channels tracking.
    pub fn new() -> Self {
        Self {
            flags: [
                ChannelFlag::new(),
                ChannelFlag::new(),
                ChannelFlag::new(),
                ChannelFlag::new(),
            ],
        }
    }

    /// Whether `channel` currently delivers notifications.
    pub fn is_tracking(&self, channel: NotificationChannel) -> bool {
        self.flags[channel.index()].tracking.load(Ordering::Acquire)
    }

    /// Move `channel` from tracking to suppressed.
    pub fn begin(&self, channel: NotificationChannel) -> CollectionResult<()> {
        let flag = &self.flags[channel.index()];
        let _transition = flag.transition.lock();

        if !flag.tracking.load(Ordering::Acquire) {
            return Err(CollectionError::AlreadySuppressed { channel });
        }
        flag.tracking.store(false, Ordering::Release);

        debug!("{} notifications suppressed", channel);
        Ok(())
    }

    /// Move `channel` back to tracking.
    pub fn end(&self, channel: NotificationChannel) {
        let flag = &self.flags[channel.index()];
        let _transition = flag.transition.lock();
        flag.tracking.store(true, Ordering::Release);

        debug!("{} notifications resumed", channel);
    }
}

type Release = Box<dyn FnOnce() -> CollectionResult<()> + Send>;

/// An open suppression window. Dropping it ends the window.
#[must_use = "dropping the guard ends the suppression immediately"]
pub struct SuppressionGuard {
    channel: NotificationChannel,
    release: Option<Release>,
}

impl SuppressionGuard {
    pub(crate) fn new(channel: NotificationChannel, release: Release) -> Self {
        Self {
            channel,
            release: Some(release),
        }
    }

    /// The suppressed channel.
    pub fn channel(&self) -> NotificationChannel {
        self.channel
    }

    /// End the window and return any fault raised by the catch-up signal.
    ///
    /// Dropping the guard does the same but can only report the fault on
    /// the unhandled-error stream.
    pub fn finish(mut self) -> CollectionResult<()> {
        match self.release.take() {
            Some(release) => release(),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for SuppressionGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuppressionGuard")
            .field("channel", &self.channel)
            .field("released", &self.release.is_none())
            .finish()
    }
}

impl Drop for SuppressionGuard {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            if let Err(e) = release() {
                warn!("Catch-up signal after {} suppression failed: {}", self.channel, e);
            }
        }
    }
}
