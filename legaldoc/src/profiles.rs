//! Embedded document profiles
//!
//! This module contains the profiles for every supported document type,
//! compiled into the binary.

use crate::profile_config::{DocumentProfile, ProfileConfigError};
use std::collections::HashMap;

/// Profile metadata for display and lookup
#[derive(Debug, Clone)]
pub struct ProfileInfo {
    /// Profile identifier (e.g., "will")
    pub id: String,
    /// Filename abbreviation (e.g., "LWT")
    pub abbreviation: String,
    /// Profile TOML content
    pub content: &'static str,
}

/// Get all built-in profiles
///
/// # Returns
/// * `Vec<ProfileInfo>` - Every embedded profile definition
pub fn get_all_profiles() -> Vec<ProfileInfo> {
    vec![
        ProfileInfo {
            id: "will".to_string(),
            abbreviation: "LWT".to_string(),
            content: include_str!("profiles/will.toml"),
        },
        ProfileInfo {
            id: "poa".to_string(),
            abbreviation: "POA".to_string(),
            content: include_str!("profiles/poa.toml"),
        },
        ProfileInfo {
            id: "hcpoa".to_string(),
            abbreviation: "HCPOA".to_string(),
            content: include_str!("profiles/hcpoa.toml"),
        },
        ProfileInfo {
            id: "acp".to_string(),
            abbreviation: "ACP".to_string(),
            content: include_str!("profiles/acp.toml"),
        },
    ]
}

/// Get a profile by ID, abbreviation or alias
///
/// # Parameters
/// * `id` - Profile identifier, abbreviation (e.g., "LWT") or alias, in any case
///
/// # Returns
/// * `Some(ProfileInfo)` - Profile information if found
/// * `None` - No profile matches the given identifier
pub fn get_profile(id: &str) -> Option<ProfileInfo> {
    let mut lookup: HashMap<String, ProfileInfo> = HashMap::new();

    for info in get_all_profiles() {
        lookup.insert(info.id.clone(), info.clone());
        lookup.insert(info.abbreviation.to_lowercase(), info.clone());

        // Aliases live in the TOML itself
        if let Ok(profile) = parse_profile(&info) {
            for alias in profile.aliases {
                lookup.insert(alias.to_lowercase(), info.clone());
            }
        }
    }

    lookup.get(&id.to_lowercase()).cloned()
}

/// Parse an embedded profile into a DocumentProfile
///
/// # Parameters
/// * `info` - The profile information
///
/// # Returns
/// * `Ok(DocumentProfile)` - The parsed profile
/// * `Err(ProfileConfigError)` - The embedded TOML is invalid
pub fn parse_profile(info: &ProfileInfo) -> Result<DocumentProfile, ProfileConfigError> {
    toml::from_str(info.content).map_err(ProfileConfigError::ParseError)
}

/// Look up and parse a profile in one step
pub fn load_profile(id: &str) -> Option<Result<DocumentProfile, ProfileConfigError>> {
    get_profile(id).map(|info| parse_profile(&info))
}
