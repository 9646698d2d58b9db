// Library for tests to access modules

pub mod archiver;
pub mod capture;
pub mod config;
pub mod docker_repo;
pub mod error;
pub mod history_repo;
pub mod models;
pub mod poller;
pub mod routes;
pub mod stats_store;
pub mod version;
