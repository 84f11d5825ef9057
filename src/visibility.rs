//! On-screen visibility of the render surface.
//!
//! The renderer polls a [`VisibilitySource`] once per animation frame and
//! pauses while the surface is hidden. On the web the source is fed by an
//! `IntersectionObserver` and the document visibility, natively the window
//! occlusion events are forwarded through a [`channel`].

use futures::channel::mpsc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

impl Visibility {
    pub fn is_visible(self) -> bool {
        self == Visibility::Visible
    }
}

pub trait VisibilitySource {
    /// Visibility assumed before the first change is reported.
    fn initial(&self) -> Visibility {
        Visibility::Visible
    }

    /// The latest change since the last poll, `None` if nothing changed.
    fn poll(&mut self) -> Option<Visibility>;

    /// Stops observing, later polls report nothing.
    fn detach(&mut self);
}

/// A source that never reports the surface as hidden.
#[derive(Debug, Default)]
pub struct AlwaysVisible;

impl VisibilitySource for AlwaysVisible {
    fn poll(&mut self) -> Option<Visibility> {
        None
    }

    fn detach(&mut self) {}
}

/// Feeds visibility changes into a [`ChannelVisibility`].
#[derive(Clone, Debug)]
pub struct VisibilitySender(mpsc::UnboundedSender<Visibility>);

impl VisibilitySender {
    /// Returns `false` once the receiving side was detached or dropped.
    pub fn send(&self, visibility: Visibility) -> bool {
        self.0.unbounded_send(visibility).is_ok()
    }
}

#[derive(Debug)]
pub struct ChannelVisibility {
    receiver: Option<mpsc::UnboundedReceiver<Visibility>>,
}

impl VisibilitySource for ChannelVisibility {
    fn poll(&mut self) -> Option<Visibility> {
        let receiver = self.receiver.as_mut()?;
        let mut latest = None;
        while let Ok(visibility) = receiver.try_recv() {
            latest = Some(visibility);
        }
        latest
    }

    fn detach(&mut self) {
        if let Some(mut receiver) = self.receiver.take() {
            receiver.close();
        }
    }
}

pub fn channel() -> (VisibilitySender, ChannelVisibility) {
    let (sender, receiver) = mpsc::unbounded();
    (
        VisibilitySender(sender),
        ChannelVisibility {
            receiver: Some(receiver),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_reports_the_latest_change_once() {
        let (sender, mut source) = channel();
        assert_eq!(source.poll(), None);
        sender.send(Visibility::Hidden);
        sender.send(Visibility::Visible);
        sender.send(Visibility::Hidden);
        assert_eq!(source.poll(), Some(Visibility::Hidden));
        assert_eq!(source.poll(), None);
    }

    #[test]
    fn detached_sources_stop_receiving() {
        let (sender, mut source) = channel();
        source.detach();
        assert!(!sender.send(Visibility::Hidden));
        assert_eq!(source.poll(), None);
    }
}
