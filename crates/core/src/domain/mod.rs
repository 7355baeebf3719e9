pub mod product;
pub mod returns;
pub mod review;
pub mod sale;
pub mod suggestion;
