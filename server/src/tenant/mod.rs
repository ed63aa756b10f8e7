//! Tenant namespace lifecycle: provisioning a new tenant's scope,
//! collections, indexes, and template data before any request is allowed
//! to reach the store on its behalf.

mod provisioner;

pub use provisioner::NamespaceProvisioner;
