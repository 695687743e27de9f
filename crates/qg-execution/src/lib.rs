//! Order lifecycle and broker boundary.
//!
//! This crate owns everything between an approved signal and a booked fill:
//! the equity and option order records with their shared explicit state
//! machine, fill application with overfill clamping, option contract
//! validation and the canonical contract-symbol codec, the [`BrokerAdapter`]
//! capability trait, and the stateless routers that carry orders across the
//! broker boundary.
//!
//! Pure computation (transitions, fill arithmetic, validation) is
//! synchronous; only broker calls suspend.

mod broker;
mod fills;
mod option_fill;
mod option_order;
mod option_router;
mod option_validate;
mod order;
mod router;

pub use broker::{BrokerAdapter, BrokerError, BrokerOrderRecord, OrderType};
pub use fills::{Fill, FillError, FillProcessor};
pub use option_fill::{
    LifecycleKind, OptionFill, OptionFillError, OptionFillProcessor, OptionLifecycleEvent,
};
pub use option_order::{
    parse_contract_symbol, ContractSpec, OptionLeg, OptionOrder, OptionSpreadOrder, OptionType,
    SpreadBuildError, SymbolError,
};
pub use option_router::OptionOrderRouter;
pub use option_validate::{OptionContractValidator, OptionValidationError};
pub use order::{Order, OrderStatus, TransitionError};
pub use router::{CancelError, OrderRouter, RouterError};
