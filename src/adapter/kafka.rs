//! # Kafka Adapter
//!
//! Kafka service profile. The secret carries the project CA, fetched through
//! the certificate endpoint, next to the client certificate and key.

use super::{Adapter, GenericServiceAdapter, SecretData, ServiceProfile};
use crate::crd::Kafka;
use crate::remote::RemoteService;
use std::sync::Arc;

pub const PROFILE: ServiceProfile = ServiceProfile {
    service_type: "kafka",
    needs_ca_certificate: true,
    secret_fields,
};

/// Adapter factory registered for the `Kafka` kind
pub fn adapter() -> Arc<dyn Adapter<Kafka>> {
    Arc::new(GenericServiceAdapter::<Kafka>::new(PROFILE))
}

fn secret_fields(service: &RemoteService, ca: Option<&str>) -> SecretData {
    let (user, password) = service.credentials();
    let info = &service.connection_info;
    [
        ("HOST", service.uri_param("host")),
        ("PORT", service.uri_param("port")),
        ("USERNAME", user),
        ("PASSWORD", password),
        ("ACCESS_CERT", info.kafka_access_cert.as_deref().unwrap_or_default()),
        ("ACCESS_KEY", info.kafka_access_key.as_deref().unwrap_or_default()),
        ("CA_CERT", ca.unwrap_or_default()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}
