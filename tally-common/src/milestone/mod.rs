//! Progress milestones for savings goals. A goal announces progress each time
//! its balance crosses a quarter of the target, with reaching the full target
//! reported as its own distinct event.

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Milestone {
    /// 1 through 3, for 25%, 50%, and 75%
    Quarter(u8),
    Achieved,
}

impl Milestone {
    pub fn percent(&self) -> u8 {
        match self {
            Milestone::Quarter(quarter) => quarter * 25,
            Milestone::Achieved => 100,
        }
    }
}

/// Returns the highest milestone newly reached when a goal's balance moves
/// from `previous_cents` to `current_cents`, or `None` when no quarter
/// boundary was crossed. Balance decreases never produce a milestone, and a
/// goal that already met its target doesn't announce again on further
/// contributions.
pub fn crossed(previous_cents: i64, current_cents: i64, target_cents: i64) -> Option<Milestone> {
    if target_cents <= 0 {
        return None;
    }

    let previous_quarter = quarter_index(previous_cents, target_cents);
    let current_quarter = quarter_index(current_cents, target_cents);

    if current_quarter <= previous_quarter {
        return None;
    }

    if current_quarter == 4 {
        Some(Milestone::Achieved)
    } else {
        Some(Milestone::Quarter(current_quarter))
    }
}

fn quarter_index(balance_cents: i64, target_cents: i64) -> u8 {
    let quarters = balance_cents.max(0).saturating_mul(4) / target_cents;
    quarters.clamp(0, 4) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crossing_a_single_quarter() {
        // 20% -> 35% crosses the 25% line
        assert_eq!(
            crossed(40_000, 70_000, 200_000),
            Some(Milestone::Quarter(1))
        );
    }

    #[test]
    fn landing_exactly_on_a_boundary_counts() {
        assert_eq!(
            crossed(40_000, 50_000, 200_000),
            Some(Milestone::Quarter(1))
        );
        assert_eq!(
            crossed(99_999, 100_000, 200_000),
            Some(Milestone::Quarter(2))
        );
    }

    #[test]
    fn jumping_several_quarters_reports_only_the_highest() {
        assert_eq!(crossed(0, 160_000, 200_000), Some(Milestone::Quarter(3)));
    }

    #[test]
    fn reaching_the_target_is_achieved_not_a_quarter() {
        assert_eq!(crossed(190_000, 200_000, 200_000), Some(Milestone::Achieved));
        assert_eq!(crossed(150_000, 250_000, 200_000), Some(Milestone::Achieved));
    }

    #[test]
    fn no_announcement_within_a_quarter() {
        assert_eq!(crossed(50_000, 70_000, 200_000), None);
        assert_eq!(crossed(0, 40_000, 200_000), None);
    }

    #[test]
    fn no_announcement_when_balance_decreases() {
        assert_eq!(crossed(70_000, 40_000, 200_000), None);
        assert_eq!(crossed(200_000, 150_000, 200_000), None);
    }

    #[test]
    fn an_achieved_goal_stays_quiet() {
        assert_eq!(crossed(200_000, 260_000, 200_000), None);
        assert_eq!(crossed(250_000, 300_000, 200_000), None);
    }

    #[test]
    fn degenerate_targets_never_announce() {
        assert_eq!(crossed(0, 1_000, 0), None);
        assert_eq!(crossed(0, 1_000, -5), None);
    }

    #[test]
    fn milestone_percentages() {
        assert_eq!(Milestone::Quarter(1).percent(), 25);
        assert_eq!(Milestone::Quarter(2).percent(), 50);
        assert_eq!(Milestone::Quarter(3).percent(), 75);
        assert_eq!(Milestone::Achieved.percent(), 100);
    }
}
