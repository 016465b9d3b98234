//! Bounded event queue between interrupt handlers and the control loop.
//!
//! Interrupt handlers only push; the control loop drains. Pushing into a
//! full queue drops the new event and reports it, so a wedged control
//! loop degrades to lost events instead of corrupted state.

/// Something an interrupt handler observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// A byte arrived on the serial bus.
    SerialByte(u8),
    /// The calibration button was released.
    CalibrateButton,
    /// The identity button was released.
    IdentityButton,
}

pub struct EventQueue<const N: usize> {
    buffer: [Option<Event>; N],
    head: usize,
    len: usize,
}

impl<const N: usize> EventQueue<N> {
    pub const fn new() -> Self {
        Self {
            buffer: [None; N],
            head: 0,
            len: 0,
        }
    }

    /// Returns false if the queue was full and the event was dropped.
    #[must_use]
    pub fn push(&mut self, event: Event) -> bool {
        if self.len == N {
            return false;
        }
        self.buffer[(self.head + self.len) % N] = Some(event);
        self.len += 1;
        true
    }

    pub fn pop(&mut self) -> Option<Event> {
        if self.len == 0 {
            return None;
        }
        let event = self.buffer[self.head].take();
        self.head = (self.head + 1) % N;
        self.len -= 1;
        event
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<const N: usize> Default for EventQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_come_out_in_push_order() {
        let mut q: EventQueue<4> = EventQueue::new();
        assert!(q.push(Event::SerialByte(b'a')));
        assert!(q.push(Event::CalibrateButton));
        assert_eq!(q.pop(), Some(Event::SerialByte(b'a')));
        assert_eq!(q.pop(), Some(Event::CalibrateButton));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn full_queue_rejects_instead_of_overwriting() {
        let mut q: EventQueue<2> = EventQueue::new();
        assert!(q.push(Event::SerialByte(1)));
        assert!(q.push(Event::SerialByte(2)));
        assert!(!q.push(Event::SerialByte(3)));
        assert_eq!(q.pop(), Some(Event::SerialByte(1)));
        assert!(q.push(Event::SerialByte(3)));
        assert_eq!(q.pop(), Some(Event::SerialByte(2)));
        assert_eq!(q.pop(), Some(Event::SerialByte(3)));
        assert!(q.is_empty());
    }

    #[test]
    fn wraps_around_the_storage() {
        let mut q: EventQueue<2> = EventQueue::new();
        for i in 0..7 {
            assert!(q.push(Event::SerialByte(i)));
            assert_eq!(q.pop(), Some(Event::SerialByte(i)));
        }
    }
}
