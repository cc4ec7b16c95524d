use std::{fmt, str::FromStr};

/// A deployment of the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    UsWest1,
    EuCentral1,
    ApacSoutheast1,
    Staging,
}

struct RegionMeta {
    name: &'static str,
    api_base_url: &'static str,
    app_base_url: &'static str,
}

impl Region {
    pub const ALL: [Region; 4] = [
        Region::UsWest1,
        Region::EuCentral1,
        Region::ApacSoutheast1,
        Region::Staging,
    ];

    fn meta(&self) -> RegionMeta {
        match self {
            Region::UsWest1 => RegionMeta {
                name: "us-west-1",
                api_base_url: "https://api.us-west-1.saucelabs.com",
                app_base_url: "https://app.saucelabs.com",
            },
            Region::EuCentral1 => RegionMeta {
                name: "eu-central-1",
                api_base_url: "https://api.eu-central-1.saucelabs.com",
                app_base_url: "https://app.eu-central-1.saucelabs.com",
            },
            Region::ApacSoutheast1 => RegionMeta {
                name: "apac-southeast-1",
                api_base_url: "https://api.apac-southeast-1.saucelabs.com",
                app_base_url: "https://app.apac-southeast-1.saucelabs.com",
            },
            Region::Staging => RegionMeta {
                name: "staging",
                api_base_url: "https://api.staging.saucelabs.net",
                app_base_url: "https://app.staging.saucelabs.net",
            },
        }
    }

    pub fn name(&self) -> &'static str {
        self.meta().name
    }

    pub fn api_base_url(&self) -> &'static str {
        self.meta().api_base_url
    }

    pub fn app_base_url(&self) -> &'static str {
        self.meta().app_base_url
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Region::ALL
            .into_iter()
            .find(|region| region.name() == s)
            .ok_or_else(|| format!("Unknown region {s}"))
    }
}
