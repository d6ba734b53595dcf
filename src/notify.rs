//! Publish/subscribe bus of plot notifications.
use std::collections::{BTreeMap, VecDeque};

use glam::{Mat4, Vec2};

use crate::gesture::GestureShape;

/// Camera state attached to view related notifications.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewInfo {
    pub view: Mat4,
    pub target: Vec2,
    pub distance: f32,
    pub rotation: f32,
    /// Visible domains of the axis scales, if configured.
    pub x_domain: Option<[f32; 2]>,
    pub y_domain: Option<[f32; 2]>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Init,
    Destroy,
    Select { points: Vec<usize> },
    Deselect,
    PointOver(usize),
    PointOut(usize),
    SelectionStart,
    SelectionExtend { shape: GestureShape },
    SelectionEnd { shape: GestureShape, merge: bool },
    Filter { points: Vec<usize> },
    Unfilter,
    TransitionStart,
    TransitionEnd,
    PointConnectionsDraw,
    View(ViewInfo),
    Drawing(ViewInfo),
    Draw(ViewInfo),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NotificationKind {
    Init,
    Destroy,
    Select,
    Deselect,
    PointOver,
    PointOut,
    SelectionStart,
    SelectionExtend,
    SelectionEnd,
    Filter,
    Unfilter,
    TransitionStart,
    TransitionEnd,
    PointConnectionsDraw,
    View,
    Drawing,
    Draw,
}

impl NotificationKind {
    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name {
            "init" => Self::Init,
            "destroy" => Self::Destroy,
            "select" => Self::Select,
            "deselect" => Self::Deselect,
            "pointover" => Self::PointOver,
            "pointout" => Self::PointOut,
            "selectionStart" | "lassoStart" => Self::SelectionStart,
            "selectionExtend" | "lassoExtend" => Self::SelectionExtend,
            "selectionEnd" | "lassoEnd" => Self::SelectionEnd,
            "filter" => Self::Filter,
            "unfilter" => Self::Unfilter,
            "transitionStart" => Self::TransitionStart,
            "transitionEnd" => Self::TransitionEnd,
            "pointConnectionsDraw" => Self::PointConnectionsDraw,
            "view" => Self::View,
            "drawing" => Self::Drawing,
            "draw" => Self::Draw,
            _ => return None,
        };
        Some(kind)
    }
}

impl Notification {
    pub fn kind(&self) -> NotificationKind {
        match self {
            Notification::Init => NotificationKind::Init,
            Notification::Destroy => NotificationKind::Destroy,
            Notification::Select { .. } => NotificationKind::Select,
            Notification::Deselect => NotificationKind::Deselect,
            Notification::PointOver(_) => NotificationKind::PointOver,
            Notification::PointOut(_) => NotificationKind::PointOut,
            Notification::SelectionStart => NotificationKind::SelectionStart,
            Notification::SelectionExtend { .. } => NotificationKind::SelectionExtend,
            Notification::SelectionEnd { .. } => NotificationKind::SelectionEnd,
            Notification::Filter { .. } => NotificationKind::Filter,
            Notification::Unfilter => NotificationKind::Unfilter,
            Notification::TransitionStart => NotificationKind::TransitionStart,
            Notification::TransitionEnd => NotificationKind::TransitionEnd,
            Notification::PointConnectionsDraw => NotificationKind::PointConnectionsDraw,
            Notification::View(_) => NotificationKind::View,
            Notification::Drawing(_) => NotificationKind::Drawing,
            Notification::Draw(_) => NotificationKind::Draw,
        }
    }
}

pub type Callback = Box<dyn FnMut(&Notification)>;

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    kind: NotificationKind,
    id: u64,
}

impl Subscription {
    pub fn kind(&self) -> NotificationKind {
        self.kind
    }
}

struct Subscriber {
    id: u64,
    callback: Callback,
    remaining: Option<usize>,
}

/// Delivers notifications to subscribers, either right away or on the next
/// [`EventBus::flush`].
#[derive(Default)]
pub struct EventBus {
    subscribers: BTreeMap<NotificationKind, Vec<Subscriber>>,
    queue: VecDeque<Notification>,
    next_id: u64,
    sync: bool,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.values().map(Vec::len).sum::<usize>())
            .field("queue", &self.queue)
            .field("sync", &self.sync)
            .finish()
    }
}

impl EventBus {
    pub fn new(sync: bool) -> Self {
        Self {
            sync,
            ..Default::default()
        }
    }

    pub fn set_sync(&mut self, sync: bool) {
        self.sync = sync;
    }

    /// Registers a callback. With `times` set the subscription ends after
    /// that many deliveries.
    pub fn subscribe(&mut self, kind: NotificationKind, callback: Callback, times: Option<usize>) -> Subscription {
        let id = self.next_id;
        self.next_id += 1;
        self.subscribers.entry(kind).or_default().push(Subscriber {
            id,
            callback,
            remaining: times,
        });
        Subscription { kind, id }
    }

    pub fn unsubscribe(&mut self, subscription: Subscription) {
        if let Some(subscribers) = self.subscribers.get_mut(&subscription.kind) {
            subscribers.retain(|s| s.id != subscription.id);
        }
    }

    pub fn num_subscribers(&self, kind: NotificationKind) -> usize {
        self.subscribers.get(&kind).map_or(0, Vec::len)
    }

    /// Publishes a notification, queueing it unless the bus is synchronous.
    pub fn publish(&mut self, notification: Notification) {
        if self.sync {
            self.deliver(&notification);
        } else {
            self.queue.push_back(notification);
        }
    }

    pub fn publish_sync(&mut self, notification: Notification) {
        self.deliver(&notification);
    }

    /// Delivers all queued notifications in publication order.
    pub fn flush(&mut self) {
        while let Some(notification) = self.queue.pop_front() {
            self.deliver(&notification);
        }
    }

    /// Drops all subscribers and queued notifications.
    pub fn clear(&mut self) {
        self.subscribers.clear();
        self.queue.clear();
    }

    fn deliver(&mut self, notification: &Notification) {
        let Some(subscribers) = self.subscribers.get_mut(&notification.kind()) else {
            return;
        };

        for subscriber in subscribers.iter_mut() {
            (subscriber.callback)(notification);
            if let Some(remaining) = subscriber.remaining.as_mut() {
                *remaining = remaining.saturating_sub(1);
            }
        }
        subscribers.retain(|s| s.remaining != Some(0));
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<Notification>>>, Callback) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        (log, Box::new(move |n: &Notification| sink.borrow_mut().push(n.clone())))
    }

    #[test]
    fn test_async_delivery_waits_for_flush() {
        let mut bus = EventBus::new(false);
        let (log, callback) = recorder();
        bus.subscribe(NotificationKind::Deselect, callback, None);

        bus.publish(Notification::Deselect);
        assert!(log.borrow().is_empty());
        bus.flush();
        assert_eq!(log.borrow().as_slice(), &[Notification::Deselect]);

        bus.publish_sync(Notification::Deselect);
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn test_limited_subscription() {
        let mut bus = EventBus::new(true);
        let (log, callback) = recorder();
        bus.subscribe(NotificationKind::PointOver, callback, Some(1));

        bus.publish(Notification::PointOver(3));
        bus.publish(Notification::PointOver(4));
        assert_eq!(log.borrow().as_slice(), &[Notification::PointOver(3)]);
        assert_eq!(bus.num_subscribers(NotificationKind::PointOver), 0);
    }

    #[test]
    fn test_unsubscribe() {
        let mut bus = EventBus::new(true);
        let (log, callback) = recorder();
        let subscription = bus.subscribe(NotificationKind::Unfilter, callback, None);
        bus.unsubscribe(subscription);
        bus.publish(Notification::Unfilter);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(NotificationKind::from_name("pointout"), Some(NotificationKind::PointOut));
        assert_eq!(NotificationKind::from_name("lassoEnd"), Some(NotificationKind::SelectionEnd));
        assert_eq!(NotificationKind::from_name("nope"), None);
    }
}
