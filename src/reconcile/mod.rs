// Reconcilers: make stored state agree with existing records or newly observed facts.

pub mod details;
pub mod services;

pub use details::{DetailReconciler, HardwareCatalog};
pub use services::{
    RECENT_SERVICES_LIMIT, dedupe_observed, load_recent_services, merge_observed, record_ports,
};
