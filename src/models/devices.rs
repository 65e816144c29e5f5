use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Juniper device family. Each site has at most one device per family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    Mx,
    Qfx,
    Ex,
}

impl Family {
    pub fn as_str(self) -> &'static str {
        match self {
            Family::Mx => "mx",
            Family::Qfx => "qfx",
            Family::Ex => "ex",
        }
    }

    /// Substring of the device name that identifies the family in NetBox
    /// (e.g. br1-svc.ch3.corp.example.com is the MX at ch3).
    pub fn role_hint(self) -> &'static str {
        match self {
            Family::Mx => "br1",
            Family::Qfx => "csw1",
            Family::Ex => "ls1",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the software version lives in `get-software-information`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionFormat {
    /// `<junos-version>`
    JunosVersion,
    /// Package comment, version between brackets: "JUNOS EX Software Suite [12.3R12.4]"
    PackageComment,
}

/// Hardware model, tagged with the capabilities the sync cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceModel {
    Mx,
    Qfx,
    Ex2200,
    Ex3400,
}

impl DeviceModel {
    pub fn family(self) -> Family {
        match self {
            DeviceModel::Mx => Family::Mx,
            DeviceModel::Qfx => Family::Qfx,
            DeviceModel::Ex2200 | DeviceModel::Ex3400 => Family::Ex,
        }
    }

    pub fn version_format(self) -> VersionFormat {
        match self {
            DeviceModel::Ex2200 => VersionFormat::PackageComment,
            _ => VersionFormat::JunosVersion,
        }
    }

    /// Model assumed for a family when no site override exists
    pub fn default_for(family: Family) -> Self {
        match family {
            Family::Mx => DeviceModel::Mx,
            Family::Qfx => DeviceModel::Qfx,
            Family::Ex => DeviceModel::Ex2200,
        }
    }
}

impl FromStr for DeviceModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mx" => Ok(DeviceModel::Mx),
            "qfx" => Ok(DeviceModel::Qfx),
            "ex2200" => Ok(DeviceModel::Ex2200),
            "ex3400" => Ok(DeviceModel::Ex3400),
            other => Err(format!("unknown device model '{}'", other)),
        }
    }
}

/// A device resolved through NetBox and ready to be queried
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceTarget {
    pub site: String,
    /// NetBox device name, which is also the management FQDN
    pub name: String,
    pub id: i64,
    pub model: DeviceModel,
}

impl DeviceTarget {
    pub fn family(&self) -> Family {
        self.model.family()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_parse() {
        assert_eq!("EX3400".parse::<DeviceModel>(), Ok(DeviceModel::Ex3400));
        assert_eq!(" ex2200 ".parse::<DeviceModel>(), Ok(DeviceModel::Ex2200));
        assert!("srx".parse::<DeviceModel>().is_err());
    }

    #[test]
    fn test_model_capabilities() {
        assert_eq!(DeviceModel::Ex2200.version_format(), VersionFormat::PackageComment);
        assert_eq!(DeviceModel::Ex3400.version_format(), VersionFormat::JunosVersion);
        assert_eq!(DeviceModel::Ex3400.family(), Family::Ex);
        assert_eq!(DeviceModel::default_for(Family::Ex), DeviceModel::Ex2200);
    }
}
