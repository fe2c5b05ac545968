//!
//! # Configuration
//!
//! The type [`Config`] is read from a TOML file with [`Config::from_toml`],
//! every field has a default value.

/*
 * vSMTP mail transfer agent
 * Copyright (C) 2022 viridIT SAS
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or any later version.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT
 * ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
 * FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * this program. If not, see https://www.gnu.org/licenses/.
 *
*/

#![doc(html_no_source)]
#![deny(missing_docs)]
#![forbid(unsafe_code)]
//
#![warn(rust_2018_idioms)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]
//
#![allow(clippy::use_self)] // false positive

mod parser {
    pub mod tls_certificate;
    pub mod tls_private_key;
    pub mod tracing_directive;
}

mod config;
mod default;
mod ensure;
mod rustls_helper;

pub use config::{field, Config};
pub use rustls_helper::get_rustls_config;

impl Config {
    /// Parse a [`Config`] with [TOML] format
    ///
    /// # Errors
    ///
    /// * data is not a valid [TOML]
    /// * one field is unknown
    /// * the version requirement are not fulfilled
    /// * the certificate or the private key cannot be read
    /// * see [`Config::ensure`]
    ///
    /// [TOML]: https://github.com/toml-lang/toml
    pub fn from_toml(input: &str) -> anyhow::Result<Self> {
        #[derive(serde::Deserialize)]
        struct VersionRequirement {
            version_requirement: Option<semver::VersionReq>,
        }

        let pkg_version = semver::Version::parse(env!("CARGO_PKG_VERSION"))?;
        if let Some(version_requirement) =
            toml::from_str::<VersionRequirement>(input)?.version_requirement
        {
            anyhow::ensure!(
                version_requirement.matches(&pkg_version),
                "Version requirement not fulfilled: expected '{version_requirement}' but got '{pkg_version}'"
            );
        }

        toml::from_str::<Self>(input)
            .map(Self::ensure)
            .map_err(anyhow::Error::new)?
    }
}
