use crate::domain::{Epoch, LocationFix};

/// Committed store changes, in commit order.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Location(LocationFix),
    Reset { timestamp: i64, epoch: Epoch },
}
