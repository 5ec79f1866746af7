//! Circle-method round-robin scheduling.
//!
//! Produces `n-1` rounds for even `n` and `n` rounds (one bye per round) for
//! odd `n`, with every unordered pair of entrants meeting exactly once. The
//! schedule is computed over entrant indices `0..n`; callers map indices to
//! registrations, which keeps the scheduler free of any ordering decisions
//! beyond the input order itself.

/// One round of play: ordered pairs plus at most one bye
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    pub pairs: Vec<(usize, usize)>,
    pub bye: Option<usize>,
}

/// Complete round-robin schedule over entrant indices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    pub rounds: Vec<Round>,
}

impl Schedule {
    /// Total number of scheduled pairings; byes do not count.
    pub fn match_count(&self) -> usize {
        self.rounds.iter().map(|r| r.pairs.len()).sum()
    }
}

/// Compute the round-robin schedule for `n` entrants using the standard
/// circle method: fix position 0, rotate the remaining positions once per
/// round, and pair opposite positions.
///
/// For odd `n` a phantom entrant fills the circle; whoever is paired against
/// it sits out that round as the bye.
pub fn round_robin(n: usize) -> Schedule {
    if n < 2 {
        return Schedule { rounds: Vec::new() };
    }

    let circle = if n % 2 == 0 { n } else { n + 1 };
    let phantom = n; // only reachable when n is odd
    let mut positions: Vec<usize> = (0..circle).collect();
    let mut rounds = Vec::with_capacity(circle - 1);

    for _ in 0..circle - 1 {
        let mut pairs = Vec::with_capacity(circle / 2);
        let mut bye = None;
        for i in 0..circle / 2 {
            let a = positions[i];
            let b = positions[circle - 1 - i];
            if a == phantom {
                bye = Some(b);
            } else if b == phantom {
                bye = Some(a);
            } else {
                pairs.push((a, b));
            }
        }
        rounds.push(Round { pairs, bye });

        // Keep position 0 fixed, rotate the rest one step.
        positions[1..].rotate_right(1);
    }

    Schedule { rounds }
}
