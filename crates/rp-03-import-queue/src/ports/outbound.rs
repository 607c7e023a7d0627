//! Outbound port: queue persistence.

use crate::domain::state::QueueState;
use crate::error::QueueError;

/// Storage for [`QueueState`].
///
/// `transaction` must run its closure with exclusive access to the state
/// and persist the result before returning. That exclusivity is what makes
/// a claim atomic, including across processes for file-backed stores.
pub trait QueueStorage: Send + Sync {
    fn transaction(&self, f: &mut dyn FnMut(&mut QueueState)) -> Result<(), QueueError>;

    fn read(&self, f: &mut dyn FnMut(&QueueState)) -> Result<(), QueueError>;
}
