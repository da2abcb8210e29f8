//! Infrastructure layer: repositories, numbering, clock, config, services.

pub mod audit;
pub mod clock;
pub mod config;
pub mod directory;
pub mod error;
pub mod numbering;
pub mod rendering;
pub mod repository;
pub mod services;


pub use audit::{BillingEnvelope, BillingEvent};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::BillingConfig;
pub use directory::InMemoryAccountDirectory;
pub use error::{ErrorKind, ServiceError, ServiceResult};
pub use numbering::{DocumentNumberRegistry, InMemoryDocumentNumberRegistry, NumberingGenerator};
pub use rendering::{DocumentRenderer, PlainTextRenderer, RenderError};
pub use repository::{InMemoryRepository, Repository, StoreError};
pub use services::{BillingPorts, BillingService, NewPayment, NewQuotation};
