//! Contract routes - lifecycle, schedule status and manual payments

pub mod api;

pub use api::{
    api_activate_contract, api_cancel_contract, api_contract_detail, api_contract_status,
    api_contract_summary, api_contracts, api_create_contract, api_record_payment,
    api_update_contract, api_waive_late_fee,
};
