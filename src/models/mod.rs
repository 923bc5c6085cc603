pub mod banner;
pub mod category;
pub mod discount;
pub mod order;
pub mod product;
pub mod user;
