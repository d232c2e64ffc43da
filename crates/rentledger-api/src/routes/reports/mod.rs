//! Report routes

pub mod api;

pub use api::{
    api_dashboard, api_linking_report, api_overdue_analysis, api_property_performance,
    api_property_summary, api_tenant_summary,
};
