use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::KiraError;

/// Files that can be requested for an NCBI assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AssemblyFormat {
    Fna,
    Gbff,
    Gff,
    Rna,
    Cds,
    Prot,
}

impl AssemblyFormat {
    pub const ALL: [AssemblyFormat; 6] = [
        AssemblyFormat::Fna,
        AssemblyFormat::Gbff,
        AssemblyFormat::Gff,
        AssemblyFormat::Rna,
        AssemblyFormat::Cds,
        AssemblyFormat::Prot,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            AssemblyFormat::Fna => "fna",
            AssemblyFormat::Gbff => "gbff",
            AssemblyFormat::Gff => "gff",
            AssemblyFormat::Rna => "rna",
            AssemblyFormat::Cds => "cds",
            AssemblyFormat::Prot => "prot",
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            AssemblyFormat::Fna => "genomic.fna.gz",
            AssemblyFormat::Gbff => "genomic.gbff.gz",
            AssemblyFormat::Gff => "genomic.gff.gz",
            AssemblyFormat::Rna => "rna_from_genomic.fna.gz",
            AssemblyFormat::Cds => "cds_from_genomic.fna.gz",
            AssemblyFormat::Prot => "translated_cds.faa.gz",
        }
    }

    /// `{assembly}_{suffix}`, the name used both remotely and locally.
    pub fn file_name(self, assembly: &AssemblyName) -> String {
        format!("{}_{}", assembly.as_str(), self.suffix())
    }
}

impl fmt::Display for AssemblyFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for AssemblyFormat {
    type Err = KiraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        AssemblyFormat::ALL
            .into_iter()
            .find(|format| format.tag() == normalized)
            .ok_or_else(|| KiraError::InvalidFormat(value.to_string()))
    }
}

/// Drops repeated formats, keeping the first occurrence.
pub fn dedup_formats(formats: &[AssemblyFormat]) -> Vec<AssemblyFormat> {
    let mut unique = Vec::with_capacity(formats.len());
    for format in formats {
        if !unique.contains(format) {
            unique.push(*format);
        }
    }
    unique
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Ftp,
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Ftp => "ftp",
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            Scheme::Ftp => 21,
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scheme {
    type Err = KiraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "ftp" => Ok(Scheme::Ftp),
            "http" => Ok(Scheme::Http),
            "https" => Ok(Scheme::Https),
            other => Err(KiraError::UnsupportedScheme(other.to_string())),
        }
    }
}

/// A remote file or directory, split into its parts once at parse time.
///
/// `path` always starts with `/` and never ends with one (except for the root).
/// An explicit `port` is kept only when it differs from the scheme default.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteLocation {
    scheme: Scheme,
    host: String,
    port: Option<u16>,
    path: String,
}

impl RemoteLocation {
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.scheme.default_port())
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn with_scheme(&self, scheme: Scheme) -> Self {
        let port = self.port.filter(|port| *port != scheme.default_port());
        Self {
            scheme,
            host: self.host.clone(),
            port,
            path: self.path.clone(),
        }
    }

    /// Assembly directories given as HTTPS links are read over anonymous FTP.
    pub fn normalized(&self) -> Self {
        match self.scheme {
            Scheme::Https => self.with_scheme(Scheme::Ftp),
            _ => self.clone(),
        }
    }

    pub fn join(&self, name: &str) -> Self {
        let path = if self.path == "/" {
            format!("/{name}")
        } else {
            format!("{}/{name}", self.path)
        };
        Self {
            scheme: self.scheme,
            host: self.host.clone(),
            port: self.port,
            path,
        }
    }

    pub fn last_segment(&self) -> Option<&str> {
        self.path.rsplit('/').next().filter(|segment| !segment.is_empty())
    }
}

impl fmt::Display for RemoteLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        f.write_str(&self.path)
    }
}

impl FromStr for RemoteLocation {
    type Err = KiraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let parsed = Url::parse(trimmed).map_err(|_| KiraError::InvalidUrl(value.to_string()))?;
        let scheme: Scheme = parsed.scheme().parse()?;
        let host = parsed
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| KiraError::InvalidUrl(value.to_string()))?
            .to_string();
        let port = parsed.port().filter(|port| *port != scheme.default_port());
        let path = parsed.path().trim_end_matches('/');
        let path = if path.is_empty() {
            "/".to_string()
        } else {
            path.to_string()
        };
        Ok(Self {
            scheme,
            host,
            port,
            path,
        })
    }
}

/// Full assembly name, e.g. `GCF_000005845.2_ASM584v2`, taken from the last
/// segment of the assembly directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssemblyName(String);

impl AssemblyName {
    pub fn from_location(location: &RemoteLocation) -> Result<Self, KiraError> {
        location
            .last_segment()
            .map(|segment| Self(segment.to_string()))
            .ok_or_else(|| KiraError::InvalidUrl(location.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssemblyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
