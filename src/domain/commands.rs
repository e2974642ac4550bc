use crate::domain::{Epoch, LocationFix};
use crate::store::Subscription;
use tokio::sync::oneshot;

#[derive(Debug)]
pub enum Command {
    UpdateLocation { fix: LocationFix, reply: oneshot::Sender<()> },
    Reset { timestamp: i64, reply: oneshot::Sender<Epoch> },
    Subscribe { reply: oneshot::Sender<Subscription> },
}
