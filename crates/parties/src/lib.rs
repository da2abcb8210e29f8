//! Customers domain module (a shop's address book).
//!
//! Customers are mutable; quotations and invoices keep a [`CustomerSnapshot`]
//! taken when the document is created, so later edits never touch a legal
//! record. Pure domain logic (no IO, no HTTP, no storage).

pub mod customer;

pub use customer::{
    Customer, CustomerCommand, CustomerDetails, CustomerEvent, CustomerRegistered,
    CustomerSnapshot, CustomerUpdated, RegisterCustomer, UpdateCustomer,
};
