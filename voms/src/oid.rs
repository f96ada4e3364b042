// Copyright (c) 2023 The MobileCoin Foundation

//! Object identifiers for VOMS attribute certificates and proxy certificates

use const_oid::ObjectIdentifier;

/// Proxy certificate extension holding the sequence of VOMS ACs
pub const VOMS_EXTENSION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.4.1.8005.100.100.5");
/// AC attribute holding the FQANs
pub const VOMS_FQANS: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.4.1.8005.100.100.4");
/// AC extension holding the AA certificate chain
pub const VOMS_AC_CERTS: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.4.1.8005.100.100.10");
/// AC extension holding the generic attributes
pub const VOMS_GENERIC_ATTRIBUTES: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.4.1.8005.100.100.11");

/// RFC3820 proxy certificate information
pub const PROXY_CERT_INFO: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.1.14");
/// Pre RFC (Globus Toolkit 3) proxy certificate information
pub const DRAFT_PROXY_CERT_INFO: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.4.1.3536.1.222");

/// Proxy policy language, the proxy inherits all rights of its issuer
pub const INHERIT_ALL_POLICY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.21.1");
/// Proxy policy language, the proxy inherits no rights of its issuer
pub const INDEPENDENT_POLICY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.21.2");
/// Proxy policy language used by Globus for limited proxies
pub const LIMITED_PROXY_POLICY: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.4.1.3536.1.1.1.9");
