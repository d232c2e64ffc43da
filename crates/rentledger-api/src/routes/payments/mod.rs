//! Payment routes - receive, validate, link, cancel and retry

pub mod api;

pub use api::{
    api_cancel_payment, api_cancellation_impact, api_link_payment, api_payment_detail,
    api_payments, api_receive_payment, api_retry_operation, api_validate_payment,
};
