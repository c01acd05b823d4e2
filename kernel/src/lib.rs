pub mod model;
pub mod notifier;
pub mod repository;
pub mod service;
