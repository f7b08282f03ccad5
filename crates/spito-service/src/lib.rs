//! The spit lifecycle: validate, save, load, count views, delete.
//!
//! Request-handling layers call into [`SpitService`]; everything it needs
//! from storage goes through the [`Storager`](spito_core::Storager) it is
//! handed at startup.

pub mod service;
pub mod view;

pub use service::SpitService;
pub use view::SpitView;
