//! Hysteresis evaluation of thresholds against snapshots.
//!
//! A threshold fires when the observed change reaches its trigger in the
//! trigger's direction, then stays quiet until the change re-crosses the
//! boundary (or zero). The persisted fired-state carries that memory between
//! poll cycles.

use coinwatch_core::{AlertThreshold, CoinSnapshot};

/// Outcome of evaluating one threshold against one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    /// Crossing detected: notify and set fired-state.
    Fire,
    /// Still past the trigger but already notified: stay quiet.
    Hold,
    /// Change dropped below the trigger (or flipped sign): clear fired-state.
    Rearm,
    /// Snapshot has no reading for this window: leave state untouched.
    Skip,
}

/// Decide what a threshold does for a snapshot, given its current
/// fired-state.
///
/// Boundary note: equality at the trigger counts as firing (`>=`).
pub fn evaluate(threshold: &AlertThreshold, snapshot: &CoinSnapshot, fired: bool) -> Evaluation {
    let Some(observed) = snapshot.change(threshold.window) else {
        // Fetch gave no reading for this window: observation skipped,
        // fired-state must survive unchanged.
        return Evaluation::Skip;
    };

    let trigger = threshold.percent_trigger;
    let same_direction = (trigger > 0.0) == (observed > 0.0) && observed != 0.0;
    let past_trigger = observed.abs() >= trigger.abs();

    if same_direction && past_trigger {
        if fired {
            Evaluation::Hold
        } else {
            Evaluation::Fire
        }
    } else if fired {
        // Below the boundary again, or the move crossed zero to the other
        // side. Either way the crossing is over.
        Evaluation::Rearm
    } else {
        Evaluation::Hold
    }
}
