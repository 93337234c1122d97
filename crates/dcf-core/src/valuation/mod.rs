pub mod dcf;
pub mod fcf;
