//! Service implementations for the component API surface.
//!
//! Each service module shapes the parameters of one endpoint family and hands
//! the calls to the dispatcher, which owns credential injection and retry.

pub mod authorization;
pub mod card;
pub mod sns;

pub use authorization::{AuthorizationService, AuthorizationServiceTrait};
pub use card::{CardService, CardServiceTrait};
pub use sns::{SnsService, SnsServiceTrait};
