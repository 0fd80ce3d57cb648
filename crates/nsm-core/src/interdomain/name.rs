//! Name grammar (`spec.md` §4.F, §6): `local-name | local-name "@" authority`,
//! where *authority* is either a transport URL (`tcp://host:port`) or a DNS
//! domain.

use url::Url;

use crate::error::{codes, ErrorCategory, NsmError, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Authority {
    Url(Url),
    Domain(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedName {
    pub local: String,
    pub authority: Option<Authority>,
}

impl ParsedName {
    /// Whether this name carries the shared `@floating-domain` suffix rule
    /// (`spec.md` §4.F): both a service and endpoint name suffixed with the
    /// same floating domain route to the floating registry rather than a
    /// local one. Callers compare two `ParsedName`s' `authority` for
    /// equality to detect this.
    pub fn is_interdomain(&self) -> bool {
        self.authority.is_some()
    }

    pub fn domain(&self) -> Option<&str> {
        match &self.authority {
            Some(Authority::Domain(d)) => Some(d),
            _ => None,
        }
    }

    pub fn reassemble(&self) -> String {
        match &self.authority {
            None => self.local.clone(),
            Some(Authority::Url(u)) => format!("{}@{}", self.local, u),
            Some(Authority::Domain(d)) => format!("{}@{}", self.local, d),
        }
    }
}

/// Parses `name` per the grammar in `spec.md` §6. Splits on the first `@`;
/// everything after it is either parsed as a transport URL (if it contains
/// `://`) or kept as a bare DNS domain.
pub fn parse(name: &str) -> Result<ParsedName> {
    if name.is_empty() {
        return Err(NsmError::new(
            ErrorCategory::InvalidArgument,
            codes::NAME_SYNTAX_INVALID,
            "endpoint/service name must not be empty",
        ));
    }

    match name.split_once('@') {
        None => Ok(ParsedName { local: name.to_string(), authority: None }),
        Some((local, authority_str)) => {
            if local.is_empty() || authority_str.is_empty() {
                return Err(NsmError::new(
                    ErrorCategory::InvalidArgument,
                    codes::NAME_SYNTAX_INVALID,
                    format!("malformed interdomain name {name:?}"),
                ));
            }
            let authority = if authority_str.contains("://") {
                let url = Url::parse(authority_str).map_err(|e| {
                    NsmError::with_cause(
                        ErrorCategory::InvalidArgument,
                        codes::NAME_SYNTAX_INVALID,
                        format!("invalid authority URL in {name:?}"),
                        e,
                    )
                })?;
                Authority::Url(url)
            } else {
                Authority::Domain(authority_str.to_string())
            };
            Ok(ParsedName { local: local.to_string(), authority: Some(authority) })
        }
    }
}
