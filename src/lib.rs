pub mod coincap;
pub mod datastore;
pub mod logging;
