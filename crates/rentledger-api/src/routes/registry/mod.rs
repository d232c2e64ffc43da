//! Registry routes - properties, units and tenants

pub mod api;

pub use api::{
    api_create_property, api_create_tenant, api_create_unit, api_properties, api_tenants,
    api_units,
};
