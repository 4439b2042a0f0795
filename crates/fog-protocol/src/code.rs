//! Return codes
//!
//! Every reply from the server opens with a short code on its first line.
//! The set of codes is fixed; anything else is carried through verbatim as
//! [`ReturnCode::Unknown`] so callers can still log and inspect it.

use std::fmt;

/// Return code found on the first line of a server reply
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReturnCode {
    /// `#!ok`
    Success,
    /// `#!db`
    DatabaseError,
    /// `#!im`
    InvalidMac,
    /// `#!ihc`
    InvalidHostCertificate,
    /// `#!ih`
    InvalidHost,
    /// `#!il`
    InvalidLogin,
    /// `#!it`
    InvalidTask,
    /// `#!nvp`
    InvalidPrinter,
    /// `#!ng`
    ModuleDisabledGlobally,
    /// `#!nh`
    ModuleDisabledOnHost,
    /// `#!um`
    UnknownModule,
    /// `#!ns`
    NoSnapins,
    /// `#!nj`
    NoJobs,
    /// `#!np`
    NoPrinters,
    /// `#!na`
    NoActions,
    /// `#!nf`
    NoUpdates,
    /// `#!time`
    InvalidTime,
    /// `#!ist`
    InvalidSecurityToken,
    /// `#!er`
    GeneralError,
    /// A code outside the known set, kept as received (trimmed)
    Unknown(String),
}

impl ReturnCode {
    /// Classify a return-code line.
    ///
    /// Matching is exact on the trimmed, lower-cased line, so `#!ih` and
    /// `#!ihc` are always told apart.
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        match trimmed.to_lowercase().as_str() {
            "#!ok" => Self::Success,
            "#!db" => Self::DatabaseError,
            "#!im" => Self::InvalidMac,
            "#!ihc" => Self::InvalidHostCertificate,
            "#!ih" => Self::InvalidHost,
            "#!il" => Self::InvalidLogin,
            "#!it" => Self::InvalidTask,
            "#!nvp" => Self::InvalidPrinter,
            "#!ng" => Self::ModuleDisabledGlobally,
            "#!nh" => Self::ModuleDisabledOnHost,
            "#!um" => Self::UnknownModule,
            "#!ns" => Self::NoSnapins,
            "#!nj" => Self::NoJobs,
            "#!np" => Self::NoPrinters,
            "#!na" => Self::NoActions,
            "#!nf" => Self::NoUpdates,
            "#!time" => Self::InvalidTime,
            "#!ist" => Self::InvalidSecurityToken,
            "#!er" => Self::GeneralError,
            _ => Self::Unknown(trimmed.to_string()),
        }
    }

    /// Wire form of the code
    pub fn as_str(&self) -> &str {
        match self {
            Self::Success => "#!ok",
            Self::DatabaseError => "#!db",
            Self::InvalidMac => "#!im",
            Self::InvalidHostCertificate => "#!ihc",
            Self::InvalidHost => "#!ih",
            Self::InvalidLogin => "#!il",
            Self::InvalidTask => "#!it",
            Self::InvalidPrinter => "#!nvp",
            Self::ModuleDisabledGlobally => "#!ng",
            Self::ModuleDisabledOnHost => "#!nh",
            Self::UnknownModule => "#!um",
            Self::NoSnapins => "#!ns",
            Self::NoJobs => "#!nj",
            Self::NoPrinters => "#!np",
            Self::NoActions => "#!na",
            Self::NoUpdates => "#!nf",
            Self::InvalidTime => "#!time",
            Self::InvalidSecurityToken => "#!ist",
            Self::GeneralError => "#!er",
            Self::Unknown(raw) => raw,
        }
    }

    /// Human-readable description, `None` for unknown codes
    pub fn description(&self) -> Option<&'static str> {
        let text = match self {
            Self::Success => "Success",
            Self::DatabaseError => "Database error",
            Self::InvalidMac => "Invalid MAC address format",
            Self::InvalidHostCertificate => "Invalid host certificate",
            Self::InvalidHost => "Invalid host",
            Self::InvalidLogin => "Invalid login",
            Self::InvalidTask => "Invalid task",
            Self::InvalidPrinter => "Invalid Printer",
            Self::ModuleDisabledGlobally => "Module is disabled globally on the FOG server",
            Self::ModuleDisabledOnHost => "Module is disabled on the host",
            Self::UnknownModule => "Unknown module ID",
            Self::NoSnapins => "No snapins",
            Self::NoJobs => "No jobs",
            Self::NoPrinters => "No Printers",
            Self::NoActions => "No actions",
            Self::NoUpdates => "No updates",
            Self::InvalidTime => "Invalid time",
            Self::InvalidSecurityToken => "Invalid security token",
            Self::GeneralError => "General error",
            Self::Unknown(_) => return None,
        };
        Some(text)
    }

    /// Whether this is the success marker
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Log the code the way every request does after a reply arrives
    pub fn log(&self) {
        match self.description() {
            Some(text) => tracing::info!("Response: {}", text),
            None => tracing::info!("Unknown Response: {}", self.as_str()),
        }
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
