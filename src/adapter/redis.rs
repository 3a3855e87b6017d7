//! # Redis Adapter

use super::{Adapter, GenericServiceAdapter, SecretData, ServiceProfile};
use crate::crd::Redis;
use crate::remote::RemoteService;
use std::sync::Arc;

pub const PROFILE: ServiceProfile = ServiceProfile {
    service_type: "redis",
    needs_ca_certificate: false,
    secret_fields,
};

/// Adapter factory registered for the `Redis` kind
pub fn adapter() -> Arc<dyn Adapter<Redis>> {
    Arc::new(GenericServiceAdapter::<Redis>::new(PROFILE))
}

fn secret_fields(service: &RemoteService, _ca: Option<&str>) -> SecretData {
    let (user, password) = service.credentials();
    let ssl = if service.service_uri.starts_with("rediss://") {
        "true"
    } else {
        service.uri_param("ssl")
    };
    [
        ("HOST", service.uri_param("host")),
        ("PORT", service.uri_param("port")),
        ("USER", user),
        ("PASSWORD", password),
        ("SSL", ssl),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}
