// Library for tests to access modules

pub mod config;
pub mod discovery;
pub mod models;
pub mod reconcile;
pub mod routes;
pub mod simulator;
pub mod store;
pub mod worker;
