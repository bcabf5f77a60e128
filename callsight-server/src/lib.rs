pub mod http;
pub mod pages;
