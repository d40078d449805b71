//! Transfer session orchestration: the sender and receiver state
//! machines and their phase tracking.

pub mod phase;
pub mod receiver;
pub mod sender;

pub use phase::{ReceiverPhase, SenderPhase};
pub use receiver::{SessionOutcome, TransferReceiver};
pub use sender::TransferSender;
