//! Buffered action resolution.
//!
//! Moves and meals are recorded per cell while moxen decide, then applied in
//! one pass, so every decision in a tick sees the same grid.

/// Who wants to step into a cell
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Claim {
    Free,
    Mover(usize),
    /// Two or more movers; nobody gets the cell
    Conflict,
}

/// Move claims and eaten cells for one tick.
#[derive(Clone, Debug)]
pub struct ActionPlan {
    width: usize,
    claims: Vec<Claim>,
    eaten: Vec<bool>,
}

impl ActionPlan {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            claims: vec![Claim::Free; width * height],
            eaten: vec![false; width * height],
        }
    }

    #[inline]
    fn index(&self, (x, y): (usize, usize)) -> usize {
        y * self.width + x
    }

    /// Register `mover` for `cell`. Returns true when this claim created a
    /// new conflict.
    pub fn claim(&mut self, cell: (usize, usize), mover: usize) -> bool {
        let i = self.index(cell);
        match self.claims[i] {
            Claim::Free => {
                self.claims[i] = Claim::Mover(mover);
                false
            }
            Claim::Mover(_) => {
                self.claims[i] = Claim::Conflict;
                true
            }
            Claim::Conflict => false,
        }
    }

    pub fn claim_at(&self, cell: (usize, usize)) -> Claim {
        self.claims[self.index(cell)]
    }

    pub fn mark_eaten(&mut self, cell: (usize, usize)) {
        let i = self.index(cell);
        self.eaten[i] = true;
    }

    pub fn is_eaten(&self, cell: (usize, usize)) -> bool {
        self.eaten[self.index(cell)]
    }
}

/// What happened during a tick
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub moves: usize,
    pub conflicts: usize,
    pub eaten: usize,
    pub kills: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_claim_conflicts() {
        let mut plan = ActionPlan::new(4, 3);
        assert!(!plan.claim((1, 2), 0));
        assert_eq!(plan.claim_at((1, 2)), Claim::Mover(0));
        assert!(plan.claim((1, 2), 5));
        assert!(!plan.claim((1, 2), 6));
        assert_eq!(plan.claim_at((1, 2)), Claim::Conflict);
        assert_eq!(plan.claim_at((2, 1)), Claim::Free);
    }

    #[test]
    fn test_eat_marks() {
        let mut plan = ActionPlan::new(4, 3);
        plan.mark_eaten((3, 0));
        assert!(plan.is_eaten((3, 0)));
        assert!(!plan.is_eaten((0, 3 - 1)));
    }
}
