pub mod links;
pub mod redirect;
pub mod uploads;
