pub mod automation;
pub mod catalog;
pub mod company;
pub mod crm;
pub mod omnibridge;
pub mod template;
