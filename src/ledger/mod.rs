//! Ledger domain model and network capability traits.
//!
//! # Data Flow
//! ```text
//! ids.rs, amount.rs, types.rs (value types)
//!     → receipt.rs + status.rs (finalized outcomes)
//!     → network.rs (Gateway, QueryService, MessageFeed)
//!     → error.rs (LedgerError taxonomy shared by every subsystem)
//! ```

pub mod amount;
pub mod error;
pub mod ids;
pub mod network;
pub mod receipt;
pub mod status;
pub mod types;

pub use amount::Hbar;
pub use error::{LedgerError, LedgerResult};
pub use ids::{AccountId, EntityId, NftId, Timestamp, TokenId, TopicId, TransactionId};
pub use network::{
    AccountBalance, Gateway, MessageFeed, NftInfo, Query, QueryResponse, QueryService, Since, TokenInfo,
    TopicInfo,
};
pub use receipt::{AssignedId, Receipt};
pub use status::Status;
pub use types::{CustomFee, HbarTransfer, NftTransfer, SupplyType, TokenTransfer, TokenType, TopicMessage};
