// Copyright (c) 2023 The MobileCoin Foundation

//! X509 distinguished names as defined in sections
//! [4.1.2.4](https://datatracker.ietf.org/doc/html/rfc5280#section-4.1.2.4) and
//! [4.1.2.6](https://datatracker.ietf.org/doc/html/rfc5280#section-4.1.2.6) of
//! [RFC5280](https://datatracker.ietf.org/doc/html/rfc5280)
//!
//! Certificates carry a name as an `RDNSequence`. Grid configuration, LSC
//! files in particular, write names in the OpenSSL slash form:
//!
//! ```text
//! /C=IT/O=IGI/OU=Host/CN=voms.example.org
//! ```
//!
//! [`DistinguishedName`] compares two encoded names and renders them in the
//! slash form. [`DnPattern`] is a parsed slash form name which can be matched
//! against an encoded one. Both compare attribute values with the RFC4518
//! preparation and case folding from [`super::rfc4518`].
//!
//! Attribute values must be one of the `DirectoryString` types:
//! `PrintableString`, `UTF8String` or `IA5String`. The latter is used by
//! the domainComponent attribute as described in
//! [RFC4519](https://www.rfc-editor.org/rfc/rfc4519).

use super::rfc4518::prepare;
use super::Error;
use const_oid::db::{rfc3280, rfc4519, DB};
use const_oid::ObjectIdentifier;
use core::fmt::{Display, Formatter};
use core::str::FromStr;
use x509_cert::attr::AttributeValue;
use x509_cert::der::asn1::{Ia5StringRef, PrintableStringRef, Utf8StringRef};
use x509_cert::der::{Tag, Tagged};
use x509_cert::name::Name;

/// The names OpenSSL uses in the slash form, where they differ from the
/// OID database.
///
/// Rendering uses the first name listed for an OID.
const OPENSSL_NAMES: &[(&str, ObjectIdentifier)] = &[
    ("C", rfc4519::C),
    ("ST", rfc4519::ST),
    ("L", rfc4519::L),
    ("O", rfc4519::O),
    ("OU", rfc4519::OU),
    ("CN", rfc4519::CN),
    ("DC", rfc4519::DC),
    ("UID", rfc4519::UID),
    ("SN", rfc4519::SN),
    ("GN", rfc4519::GIVEN_NAME),
    ("emailAddress", rfc3280::EMAIL_ADDRESS),
    ("E", rfc3280::EMAIL_ADDRESS),
];

/// The OID of an attribute written as `short_name=` in the slash form.
///
/// Names are case insensitive. Dotted OIDs are accepted for attributes
/// without a name.
fn attribute_oid(short_name: &str) -> Option<ObjectIdentifier> {
    OPENSSL_NAMES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(short_name))
        .map(|(_, oid)| *oid)
        .or_else(|| DB.by_name(short_name).copied())
        .or_else(|| {
            short_name
                .starts_with(|c: char| c.is_ascii_digit())
                .then(|| ObjectIdentifier::new(short_name).ok())
                .flatten()
        })
}

fn attribute_short_name(oid: &ObjectIdentifier) -> Option<&'static str> {
    OPENSSL_NAMES
        .iter()
        .find(|(_, candidate)| candidate == oid)
        .map(|(name, _)| *name)
        .or_else(|| DB.by_oid(oid))
}

/// Whether `key` is written like an attribute name, as opposed to text
/// following a `/` inside a value
fn looks_like_attribute_name(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
}

/// An encoded name, compared and rendered the way grid tools do
#[derive(Debug, Clone, Copy)]
pub struct DistinguishedName<'a>(&'a Name);

impl<'a> From<&'a Name> for DistinguishedName<'a> {
    fn from(name: &'a Name) -> Self {
        Self(name)
    }
}

/// Does `DistinguishedName` comparison as defined in
/// https://tools.ietf.org/html/rfc5280#section-7.1
impl<'a> PartialEq for DistinguishedName<'a> {
    fn eq(&self, other: &Self) -> bool {
        let (name_1, name_2) = (self.0, other.0);
        if name_1.0.len() != name_2.0.len() {
            return false;
        }
        name_1.0.iter().zip(name_2.0.iter()).all(|(rdn_1, rdn_2)| {
            rdn_1.0.len() == rdn_2.0.len()
                && rdn_1
                    .0
                    .iter()
                    .zip(rdn_2.0.iter())
                    .all(|(attr_1, attr_2)| {
                        attr_1.oid == attr_2.oid && values_match(&attr_1.value, &attr_2.value)
                    })
        })
    }
}

/// Renders the name in the OpenSSL slash form
impl<'a> Display for DistinguishedName<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        for rdn in self.0 .0.iter() {
            let mut separator = "/";
            for attribute in rdn.0.iter() {
                f.write_str(separator)?;
                match attribute_short_name(&attribute.oid) {
                    Some(name) => f.write_str(name)?,
                    None => write!(f, "{}", attribute.oid)?,
                }
                write!(f, "={}", DisplayValue(&attribute.value))?;
                separator = "+";
            }
        }
        Ok(())
    }
}

fn values_match(value_1: &AttributeValue, value_2: &AttributeValue) -> bool {
    match (directory_string(value_1), directory_string(value_2)) {
        (Some(string_1), Some(string_2)) => prepare(string_1) == prepare(string_2),
        _ => false,
    }
}

/// The string content of a `DirectoryString` attribute value
fn directory_string(value: &AttributeValue) -> Option<&str> {
    match value.tag() {
        Tag::PrintableString => PrintableStringRef::try_from(value)
            .ok()
            .map(|s| s.as_str()),
        Tag::Utf8String => Utf8StringRef::try_from(value).ok().map(|s| s.as_str()),
        Tag::Ia5String => Ia5StringRef::try_from(value).ok().map(|s| s.as_str()),
        _ => None,
    }
}

struct DisplayValue<'a>(&'a AttributeValue);

impl<'a> Display for DisplayValue<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match directory_string(self.0) {
            Some(value) => f.write_str(value),
            None => write!(f, "#{}", hex::encode(self.0.value())),
        }
    }
}

/// A distinguished name parsed from the OpenSSL slash form.
///
/// A `/` inside a value is kept as part of the value unless it is followed by
/// an `attribute=` prefix, so `/CN=host/voms.example.org` has a single common
/// name. Attribute names are the OpenSSL short names, the names of the
/// `const_oid` database or dotted OIDs; any other name is an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnPattern {
    source: String,
    attributes: Vec<(ObjectIdentifier, String)>,
}

impl DnPattern {
    /// The name as it was written
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether `name` holds the same attributes in the same order.
    ///
    /// Multi-valued RDNs are flattened, so `/CN=a/UID=b` matches an RDN
    /// holding both attributes.
    pub fn matches(&self, name: &Name) -> bool {
        let mut attributes = name.0.iter().flat_map(|rdn| rdn.0.iter());
        for (oid, prepared) in &self.attributes {
            let Some(attribute) = attributes.next() else {
                return false;
            };
            if attribute.oid != *oid {
                return false;
            }
            match directory_string(&attribute.value) {
                Some(value) if prepare(value) == *prepared => {}
                _ => return false,
            }
        }
        attributes.next().is_none()
    }
}

impl FromStr for DnPattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let source = s.trim();
        let syntax_error = || Error::DistinguishedNameSyntax(source.to_string());
        let body = source.strip_prefix('/').ok_or_else(syntax_error)?;

        let mut parsed: Vec<(ObjectIdentifier, String)> = Vec::new();
        for component in body.split('/') {
            let attribute = match component.split_once('=') {
                Some((key, value)) => match attribute_oid(key.trim()) {
                    Some(oid) => Some((oid, value)),
                    None if looks_like_attribute_name(key.trim()) => {
                        return Err(Error::DistinguishedNameSyntax(format!(
                            "{source}: unknown attribute {key}"
                        )))
                    }
                    None => None,
                },
                None => None,
            };
            match (attribute, parsed.last_mut()) {
                (Some((oid, value)), _) => parsed.push((oid, value.to_string())),
                (None, Some((_, value))) => {
                    value.push('/');
                    value.push_str(component);
                }
                (None, None) => return Err(syntax_error()),
            }
        }

        let attributes = parsed
            .into_iter()
            .map(|(oid, value)| (oid, prepare(&value)))
            .collect();
        Ok(Self {
            source: source.to_string(),
            attributes,
        })
    }
}

impl Display for DnPattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_matches::assert_matches;
    use x509_cert::attr::AttributeTypeAndValue;
    use x509_cert::der::asn1::{SetOfVec, TeletexStringRef};
    use x509_cert::name::RelativeDistinguishedName;
    use yare::parameterized;

    fn name(attributes: &[(&str, AttributeValue)]) -> Name {
        let rdns = attributes
            .iter()
            .map(|(short_name, value)| {
                let attribute = AttributeTypeAndValue {
                    oid: attribute_oid(short_name).expect("Unknown attribute"),
                    value: value.clone(),
                };
                RelativeDistinguishedName::from(
                    SetOfVec::try_from([attribute]).expect("Failed to build RDN"),
                )
            })
            .collect::<Vec<_>>();
        Name::from(rdns)
    }

    fn utf8(value: &str) -> AttributeValue {
        AttributeValue::from(Utf8StringRef::new(value).expect("Failed to create Utf8StringRef"))
    }

    fn printable(value: &str) -> AttributeValue {
        AttributeValue::from(
            PrintableStringRef::new(value).expect("Failed to create PrintableStringRef"),
        )
    }

    fn host_name() -> Name {
        name(&[
            ("C", printable("IT")),
            ("O", utf8("IGI")),
            ("OU", utf8("Host")),
            ("CN", utf8("voms.example.org")),
        ])
    }

    #[parameterized(
        same = {"voms.example.org", "voms.example.org"},
        case_ignored = {"VOMS.example.org", "voms.EXAMPLE.org"},
        space_compression = {"Test   User", "Test User"},
    )]
    fn matching_names(value_1: &str, value_2: &str) {
        let name_1 = name(&[("C", printable("IT")), ("CN", utf8(value_1))]);
        let name_2 = name(&[("C", printable("IT")), ("CN", printable(value_2))]);
        assert_eq!(
            DistinguishedName::from(&name_1),
            DistinguishedName::from(&name_2)
        );
    }

    #[parameterized(
        different_value = {&[("C", "IT"), ("CN", "voms")], &[("C", "IT"), ("CN", "voms2")]},
        different_oid = {&[("C", "IT"), ("CN", "voms")], &[("C", "IT"), ("OU", "voms")]},
        different_length = {&[("C", "IT")], &[("C", "IT"), ("CN", "voms")]},
        different_order = {&[("O", "IGI"), ("CN", "voms")], &[("CN", "voms"), ("O", "IGI")]},
    )]
    fn mismatched_names(attributes_1: &[(&str, &str)], attributes_2: &[(&str, &str)]) {
        let build = |attributes: &[(&str, &str)]| {
            name(
                &attributes
                    .iter()
                    .map(|(key, value)| (*key, utf8(value)))
                    .collect::<Vec<_>>(),
            )
        };
        let (name_1, name_2) = (build(attributes_1), build(attributes_2));
        assert_ne!(
            DistinguishedName::from(&name_1),
            DistinguishedName::from(&name_2)
        );
    }

    #[test]
    fn unsupported_string_type_never_matches() {
        let teletex = AttributeValue::from(
            TeletexStringRef::new("voms").expect("Failed to create TeletexStringRef"),
        );
        let name_1 = name(&[("CN", teletex)]);
        let name_2 = name(&[("CN", utf8("voms"))]);
        assert_ne!(
            DistinguishedName::from(&name_1),
            DistinguishedName::from(&name_2)
        );
        assert_ne!(
            DistinguishedName::from(&name_1),
            DistinguishedName::from(&name_1)
        );
    }

    #[test]
    fn renders_slash_form() {
        let name = host_name();
        assert_eq!(
            DistinguishedName::from(&name).to_string(),
            "/C=IT/O=IGI/OU=Host/CN=voms.example.org"
        );
    }

    #[test]
    fn renders_email_and_multi_valued_rdn() {
        let attributes = [
            AttributeTypeAndValue {
                oid: attribute_oid("CN").expect("Unknown attribute"),
                value: utf8("Test User"),
            },
            AttributeTypeAndValue {
                oid: attribute_oid("emailAddress").expect("Unknown attribute"),
                value: AttributeValue::from(
                    Ia5StringRef::new("user@example.org").expect("Failed to create Ia5StringRef"),
                ),
            },
        ];
        let rdn = RelativeDistinguishedName::from(
            SetOfVec::try_from(attributes).expect("Failed to build RDN"),
        );
        let name = Name::from(vec![rdn]);
        let rendered = DistinguishedName::from(&name).to_string();
        // SET OF sorts by encoding, both orders are valid renderings
        assert!(
            rendered == "/CN=Test User+emailAddress=user@example.org"
                || rendered == "/emailAddress=user@example.org+CN=Test User",
            "unexpected rendering {rendered}"
        );
    }

    #[parameterized(
        exact = {"/C=IT/O=IGI/OU=Host/CN=voms.example.org"},
        case_and_spaces = {"/c=it/o=igi/ou=HOST/cn=VOMS.example.org  "},
        surrounding_whitespace = {"  /C=IT/O=IGI/OU=Host/CN=voms.example.org"},
    )]
    fn pattern_matches_name(pattern: &str) {
        let pattern = DnPattern::from_str(pattern).expect("Failed to parse pattern");
        assert!(pattern.matches(&host_name()));
    }

    #[parameterized(
        missing_attribute = {"/C=IT/O=IGI/CN=voms.example.org"},
        extra_attribute = {"/C=IT/O=IGI/OU=Host/CN=voms.example.org/CN=extra"},
        other_host = {"/C=IT/O=IGI/OU=Host/CN=voms2.example.org"},
        reordered = {"/O=IGI/C=IT/OU=Host/CN=voms.example.org"},
    )]
    fn pattern_does_not_match_name(pattern: &str) {
        let pattern = DnPattern::from_str(pattern).expect("Failed to parse pattern");
        assert!(!pattern.matches(&host_name()));
    }

    #[test]
    fn slash_inside_value_is_kept() {
        let pattern =
            DnPattern::from_str("/C=IT/O=IGI/CN=host/voms.example.org").expect("Failed to parse");
        let expected = name(&[
            ("C", printable("IT")),
            ("O", utf8("IGI")),
            ("CN", utf8("host/voms.example.org")),
        ]);
        assert!(pattern.matches(&expected));
        assert_eq!(pattern.as_str(), "/C=IT/O=IGI/CN=host/voms.example.org");
    }

    #[test]
    fn dotted_oid_attribute() {
        let pattern = DnPattern::from_str("/2.5.4.3=voms").expect("Failed to parse");
        assert!(pattern.matches(&name(&[("CN", utf8("voms"))])));
    }

    #[test]
    fn database_attribute_names() {
        let business_category = DB
            .by_name("businessCategory")
            .copied()
            .expect("Unknown attribute");
        let rdns = [
            ("C", printable("IT")),
            ("O", utf8("IGI")),
            ("businessCategory", utf8("Private")),
            ("CN", utf8("voms.example.org")),
        ];
        let name = name(&rdns);
        assert_eq!(
            attribute_oid("businessCategory"),
            Some(business_category)
        );
        assert_eq!(
            DistinguishedName::from(&name).to_string(),
            "/C=IT/O=IGI/businessCategory=Private/CN=voms.example.org"
        );

        let pattern =
            DnPattern::from_str("/C=IT/O=IGI/businessCategory=Private/CN=voms.example.org")
                .expect("Failed to parse pattern");
        assert!(pattern.matches(&name));
    }

    #[parameterized(
        short = {"CN"},
        lower_case = {"cn"},
        long = {"commonName"},
        dotted = {"2.5.4.3"},
    )]
    fn common_name_spellings(key: &str) {
        assert_eq!(attribute_oid(key), Some(rfc4519::CN));
    }

    #[parameterized(
        empty = {""},
        no_leading_slash = {"C=IT/CN=voms"},
        no_attribute = {"/voms.example.org"},
        unknown_first_attribute = {"/XYZ=IT/CN=voms"},
        unknown_later_attribute = {"/C=IT/XYZ=IGI/CN=voms"},
    )]
    fn invalid_pattern(pattern: &str) {
        assert_matches!(
            DnPattern::from_str(pattern),
            Err(Error::DistinguishedNameSyntax(_))
        );
    }
}
