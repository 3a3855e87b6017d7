//! # PG Adapter
//!
//! PostgreSQL service profile.

use super::{Adapter, GenericServiceAdapter, SecretData, ServiceProfile};
use crate::crd::PG;
use crate::remote::RemoteService;
use std::sync::Arc;

pub const PROFILE: ServiceProfile = ServiceProfile {
    service_type: "pg",
    needs_ca_certificate: false,
    secret_fields,
};

/// Adapter factory registered for the `PG` kind
pub fn adapter() -> Arc<dyn Adapter<PG>> {
    Arc::new(GenericServiceAdapter::<PG>::new(PROFILE))
}

fn secret_fields(service: &RemoteService, _ca: Option<&str>) -> SecretData {
    let (user, password) = service.credentials();
    [
        ("PGHOST", service.uri_param("host")),
        ("PGPORT", service.uri_param("port")),
        ("PGDATABASE", service.uri_param("dbname")),
        ("PGUSER", user),
        ("PGPASSWORD", password),
        ("PGSSLMODE", service.uri_param("sslmode")),
        ("DATABASE_URI", service.service_uri.as_str()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}
