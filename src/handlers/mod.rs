pub mod banners;
pub mod categories;
pub mod dashboard;
pub mod discounts;
pub mod orders;
pub mod products;
pub mod uploads;
pub mod users;
