//! Resolve-once result slots.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::oneshot;

/// How a waiter was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The engine reported a result for this request.
    Done(T),
    /// A newer request for the same key replaced this one.
    Superseded,
}

/// Pending result slot for one in-flight request.
///
/// `resolve` consumes the waiter, so a slot can never be resolved twice;
/// the pending maps guarantee a slot is reachable from exactly one place.
#[derive(Debug)]
pub struct Waiter<T> {
    ticket: Ticket,
    tx: oneshot::Sender<Outcome<T>>,
}

impl<T> Waiter<T> {
    pub fn new(ticket: Ticket) -> (Self, oneshot::Receiver<Outcome<T>>) {
        let (tx, rx) = oneshot::channel();
        (Self { ticket, tx }, rx)
    }

    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    /// Deliver the outcome. A caller that stopped waiting is not an error.
    pub fn resolve(self, outcome: Outcome<T>) {
        let _ = self.tx.send(outcome);
    }

    pub fn supersede(self) {
        self.resolve(Outcome::Superseded);
    }
}

/// Identifies one submission, so a late result for a superseded request is
/// never routed to its replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(pub u64);

impl std::fmt::Display for Ticket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic ticket source.
#[derive(Debug, Default)]
pub struct Tickets(AtomicU64);

impl Tickets {
    pub fn next(&self) -> Ticket {
        Ticket(self.0.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_delivers_once() {
        let (waiter, rx) = Waiter::new(Ticket(1));
        waiter.resolve(Outcome::Done(7));
        assert_eq!(rx.await.unwrap(), Outcome::Done(7));
    }

    #[tokio::test]
    async fn test_supersede() {
        let (waiter, rx) = Waiter::<u8>::new(Ticket(1));
        waiter.supersede();
        assert_eq!(rx.await.unwrap(), Outcome::Superseded);
    }

    #[test]
    fn test_resolve_after_receiver_dropped_is_silent() {
        let (waiter, rx) = Waiter::new(Ticket(1));
        drop(rx);
        waiter.resolve(Outcome::Done("late"));
    }

    #[test]
    fn test_tickets_increase() {
        let tickets = Tickets::default();
        let a = tickets.next();
        let b = tickets.next();
        assert!(b > a);
        assert_eq!(a.to_string(), "#1");
    }
}
