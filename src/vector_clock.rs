use crate::{LamportClock, ProcessId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorClock {
    /// Assume there are N processes in the system, all of whom have their own respective vector
    /// clock (say `VC_i` for each process i in {0, ..., N - 1}). Then each clock, `VC_i`, will
    /// have an underlying list of size N, `V_i` such that:
    /// - `V_i[i]` is the number of events that have taken place at process `i`,
    /// - `V_i[j]` is the number of events that process `i` **knows** to have taken place at
    ///    process `j`, (i.e. that have potentially affected process `i`).
    ///
    /// Comparing vector timestamps `U` and `V`, we say
    /// - `U == V` if, and only if, `U[i] == V[i]` for each `i`,
    /// - `U < V` if, and only if, `U[i] <= V[i]` for each `i` _and_ there exists some `j` such
    ///           that `U[j] < V[j]`, and
    /// - `U || V` (are **concurrent**) if neither `U < V` nor `V < U`, i.e. with respect to the
    ///   notion of partial ordering, we'd say `U` and `V` are **not comparable**.
    ///
    /// A component past the end of the list reads as zero, so clocks of different widths still
    /// compare and merge sensibly.
    counters: Vec<u64>,
    /// The process who owns this vector clock, i.e. process `i` would have vector clock `VC_i`
    /// from the above description. Fixed for the lifetime of the clock.
    owner: ProcessId,
}

impl LamportClock for VectorClock {
    fn bump(&mut self) {
        VectorClock::bump(self);
    }

    fn send(&mut self) -> Self {
        VectorClock::send(self)
    }

    fn receive(&mut self, incoming_clock: &Self) {
        VectorClock::receive(self, incoming_clock);
    }
}

impl VectorClock {
    /// Constructs an all-zero vector clock of width `participants` for process `owner`.
    ///
    /// The width is taken as given; [`Config::validate`](crate::Config::validate) bounds it.
    pub fn new(owner: ProcessId, participants: usize) -> Self {
        Self {
            counters: vec![0; participants.max(owner + 1)],
            owner,
        }
    }

    /// Constructs a clock from explicit components. Mostly useful for tests and for transports
    /// that decode clocks off the wire.
    pub fn from_counters(owner: ProcessId, mut counters: Vec<u64>) -> Self {
        if counters.len() <= owner {
            counters.resize(owner + 1, 0);
        }
        Self { counters, owner }
    }

    #[inline]
    pub fn owner(&self) -> ProcessId {
        self.owner
    }

    #[inline]
    pub fn as_slice(&self) -> &[u64] {
        &self.counters
    }

    /// Number of components held.
    #[inline]
    pub fn width(&self) -> usize {
        self.counters.len()
    }

    /// Fetches the clock's value for process `i`, or zero if the clock doesn't track it.
    #[inline]
    pub fn get(&self, i: ProcessId) -> u64 {
        self.counters.get(i).copied().unwrap_or_default()
    }

    /// Increments the owning process's corresponding value in the vector clock.
    pub fn bump(&mut self) {
        // A deserialized clock may be narrower than its owner's index.
        if self.counters.len() <= self.owner {
            self.counters.resize(self.owner + 1, 0);
        }
        self.counters[self.owner] += 1;
    }

    /// Returns whether this vector clock represents a state that is causal to the state that is
    /// represented by the incoming vector clock.
    #[inline]
    pub fn happens_before(&self, other: &Self) -> bool {
        self < other
    }

    /// Returns whether neither clock happens before the other (and they aren't equal).
    #[inline]
    pub fn is_concurrent_with(&self, other: &Self) -> bool {
        self.partial_cmp(other).is_none()
    }

    /// When a process intends on sending a message to another process, prepares the sending
    /// process's vector clock to be piggybacked along with the message.
    ///
    /// The send itself counts as an event, so the owner's entry is incremented before the copy is
    /// taken. The returned copy is detached from the live clock.
    #[inline]
    pub fn send(&mut self) -> Self {
        self.bump();
        self.clone()
    }

    /// When a process receives a message from another process, maintains the vector clock
    /// invariant that both:
    /// - the value corresponding to the receiving process must be incremented, since the receive
    ///   is itself an event, and
    /// - each entry of the receiving process's vector clock must then be updated to be the max
    ///   value between it and the corresponding value of the incoming message's vector clock.
    ///
    /// Afterwards this clock dominates both its own history and everything the sender knew at
    /// send time.
    #[inline]
    pub fn receive(&mut self, incoming_clock: &Self) {
        self.bump();
        self.merge(incoming_clock);
    }

    /// Merges this vector clock, in place, with the incoming one, taking each merged entry to be
    /// the maximum between the two entries.
    fn merge(&mut self, other: &Self) {
        if other.counters.len() > self.counters.len() {
            self.counters.resize(other.counters.len(), 0);
        }
        for (mine, theirs) in self.counters.iter_mut().zip(&other.counters) {
            if *mine < *theirs {
                *mine = *theirs;
            }
        }
    }

    /// Pairs up components of both clocks, padding the shorter one with zeroes.
    fn paired<'a>(&'a self, other: &'a Self) -> impl Iterator<Item = (u64, u64)> + 'a {
        let width = self.width().max(other.width());
        (0..width).map(move |i| (self.get(i), other.get(i)))
    }
}

impl PartialEq<Self> for VectorClock {
    /// Equality is over the timestamps only; two processes may well hold equal timestamps.
    fn eq(&self, other: &Self) -> bool {
        self.paired(other).all(|(left, right)| left == right)
    }
}

impl Eq for VectorClock {}

impl PartialOrd for VectorClock {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        let mut has_greater = false;
        let mut has_less = false;

        for (left, right) in self.paired(other) {
            match left.cmp(&right) {
                Ordering::Greater => has_greater = true,
                Ordering::Less => has_less = true,
                Ordering::Equal => {
                    // no-op
                }
            }
        }

        match (has_greater, has_less) {
            // V[i] >= V'[i] for all i, and there exists some j such that V[j] > V'[j] => V > V'
            (true, false) => Some(Ordering::Greater),
            // V[i] <= V'[i] for all i, and there exists some j such that V[j] < V'[j] => V < V'
            (false, true) => Some(Ordering::Less),
            // V[i] = V'[i] for all i => V = V'
            (false, false) => Some(Ordering::Equal),
            // Non-comparable, i.e. concurrent clocks!
            (true, true) => None,
        }
    }
}

impl fmt::Display for VectorClock {
    /// Renders as `(c0, c1, c2)`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, counter) in self.counters.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{counter}")?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use crate::LamportClock;
    use crate::vector_clock::VectorClock;

    #[test]
    fn test_causality() {
        let [mut vc0, mut vc1, mut vc2] = [0, 1, 2].map(|p| VectorClock::new(p, 3));

        // - Process 0 will (1) bump, (2) send a message to p1, (3), bump, (4) receive a message
        //   from p2, and (5) send a message to p1.
        // - Process 1 will (1) bump, (2) receive a message from p0, (3) send a message to p2,
        //   (4) bump, (5) receive a message from p0, and (6) bump.
        // - Process 2 will (1) bump, (2) receive a message from p1, (3) bump, and (4) send a
        //   message to p0.
        //
        // We should have 4 causal events: (0.2/1.2), (1.3/2.2), (2.4/0.4), and (0.5/1.5).

        // (1.1)
        vc1.bump();
        // (0.1)
        vc0.bump();
        // (0.2 / 1.2)
        let sending_clock = vc0.send();
        vc1.receive(&sending_clock);
        // (2.1)
        vc2.bump();

        assert!(vc0.happens_before(&vc1));
        assert!(vc2.is_concurrent_with(&vc0));
        assert!(vc2.is_concurrent_with(&vc1));

        // (0.3)
        vc0.bump();
        // (1.3 / 2.2)
        let sending_clock = vc1.send();
        vc2.receive(&sending_clock);

        assert!(vc1.happens_before(&vc2));
        assert!(vc0.is_concurrent_with(&vc1));
        assert!(vc0.is_concurrent_with(&vc2));

        // (1.4)
        vc1.bump();
        // (2.3)
        vc2.bump();
        // (2.4 / 0.4)
        let sending_clock = vc2.send();
        vc0.receive(&sending_clock);

        assert!(vc2.happens_before(&vc0));
        assert!(vc1.is_concurrent_with(&vc0));
        assert!(vc1.is_concurrent_with(&vc2));

        // (0.5 / 1.5)
        let sending_clock = vc0.send();
        vc1.receive(&sending_clock);

        assert!(vc0.happens_before(&vc1));
        // p2 is "before" p1 because of (2.4/0.4) and (0.5/1.5).
        assert!(vc2.happens_before(&vc1));
        assert!(!vc2.is_concurrent_with(&vc0));

        // (1.6)
        vc1.bump();
        assert_eq!(vc1.as_slice(), &[5, 6, 4]);
    }

    #[test]
    fn receive_increments_then_takes_componentwise_max() {
        let mut local = VectorClock::from_counters(1, vec![1, 4, 0]);
        let incoming = VectorClock::from_counters(0, vec![3, 2, 5]);

        local.receive(&incoming);

        assert_eq!(local.as_slice(), &[3, 5, 5]);
        assert_eq!(local.owner(), 1);
    }

    #[test]
    fn sent_copy_is_detached_from_live_clock() {
        let mut clock = VectorClock::new(0, 3);
        let sent = clock.send();
        clock.bump();

        assert_eq!(sent.as_slice(), &[1, 0, 0]);
        assert_eq!(clock.as_slice(), &[2, 0, 0]);
        assert!(sent.happens_before(&clock));
    }

    #[test]
    fn missing_components_read_as_zero() {
        let short = VectorClock::from_counters(0, vec![1]);
        let long = VectorClock::from_counters(0, vec![1, 0, 0]);
        assert_eq!(short, long);

        let mut narrow = VectorClock::new(0, 1);
        narrow.receive(&VectorClock::from_counters(2, vec![0, 0, 7]));
        assert_eq!(narrow.as_slice(), &[1, 0, 7]);
    }

    #[test]
    fn usable_through_lamport_clock() {
        fn ping<C: LamportClock>(from: &mut C, to: &mut C) {
            from.bump();
            let stamp = from.send();
            to.receive(&stamp);
        }

        let mut a = VectorClock::new(0, 2);
        let mut b = VectorClock::new(1, 2);
        ping(&mut a, &mut b);
        assert_eq!(b.as_slice(), &[2, 1]);
        assert!(a.happens_before(&b));
    }

    #[test]
    fn displays_as_tuple() {
        let clock = VectorClock::from_counters(2, vec![1, 0, 3]);
        assert_eq!(clock.to_string(), "(1, 0, 3)");
    }
}
