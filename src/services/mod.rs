pub mod booking_service;
pub mod booking_store;
pub mod catalog_service;
pub mod notification_service;
pub mod payment;
pub mod pricing_service;
pub mod reference_service;
pub mod refund_service;
pub mod stripe;
