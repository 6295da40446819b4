// src/handlers.rs

pub mod catalog;
pub mod companies;
pub mod crm;
pub mod omnibridge;
pub mod templates;
