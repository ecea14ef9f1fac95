//! # Winner Resolution
//!
//! Pure computation of the winner set over final option counts.

use uuid::Uuid;

use super::model::PollOption;

/// Resolve the winner set for a closed poll.
///
/// Every option whose count equals the maximum is a winner; two or more
/// entries mean a tie. All options tied at zero is a valid tie result, not
/// an error. Output order follows the option sequence's own order.
pub fn resolve_winners(options: &[PollOption]) -> Vec<Uuid> {
    let Some(max_votes) = options.iter().map(|o| o.votes).max() else {
        return Vec::new();
    };

    options
        .iter()
        .filter(|o| o.votes == max_votes)
        .map(|o| o.id)
        .collect()
}
