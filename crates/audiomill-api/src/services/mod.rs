//! Gateway-side services

mod ingress;

pub use ingress::{IngressService, SubmitReceipt};
