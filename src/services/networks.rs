use crate::models::NetworkInfo;
use crate::services::error::BatchError;
use crate::services::upload_resolver::ResolvedRow;

const KB: u64 = 1024;

/// How a network applies its size ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeLimit {
    /// Portrait + landscape together
    Combined(u64),
    /// Each asset on its own
    Individual(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdNetwork {
    pub name: &'static str,
    pub limit: Option<SizeLimit>,
}

const fn megabytes_tenths(tenths: u64) -> u64 {
    tenths * KB * KB / 10
}

pub const AD_NETWORKS: &[AdNetwork] = &[
    AdNetwork {
        name: "AppLovin",
        limit: Some(SizeLimit::Combined(megabytes_tenths(34))),
    },
    AdNetwork {
        name: "Facebook",
        limit: Some(SizeLimit::Individual(megabytes_tenths(14))),
    },
    AdNetwork {
        name: "Google",
        limit: Some(SizeLimit::Individual(megabytes_tenths(10))),
    },
    AdNetwork {
        name: "Unity",
        limit: Some(SizeLimit::Combined(megabytes_tenths(34))),
    },
    AdNetwork {
        name: "Vungle",
        limit: Some(SizeLimit::Combined(megabytes_tenths(34))),
    },
    AdNetwork {
        name: "Mintegral",
        limit: Some(SizeLimit::Combined(megabytes_tenths(34))),
    },
    AdNetwork {
        name: "IronSource",
        limit: Some(SizeLimit::Combined(megabytes_tenths(34))),
    },
    AdNetwork {
        name: "Moloco",
        limit: None,
    },
];

/// Case- and punctuation-insensitive lookup ("iron source" finds IronSource).
pub fn find_network(name: &str) -> Option<&'static AdNetwork> {
    let wanted = squash(name);
    if wanted.is_empty() {
        return None;
    }
    AD_NETWORKS.iter().find(|n| squash(n.name) == wanted)
}

fn squash(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn format_mb(bytes: u64) -> String {
    format!("{:.1} MB", bytes as f64 / (KB * KB) as f64)
}

/// Checks a resolved row against its network's size ceiling.
pub fn check_size_limit(
    position: usize,
    network_name: &str,
    row: &ResolvedRow,
) -> Result<(), BatchError> {
    let Some(network) = find_network(network_name) else {
        return Ok(());
    };

    let portrait = row.portrait.bytes.len() as u64;
    let landscape = row.landscape.bytes.len() as u64;

    match network.limit {
        Some(SizeLimit::Combined(max)) if portrait + landscape > max => {
            Err(BatchError::AssetTooLarge {
                row: position,
                detail: format!(
                    "combined file size {} exceeds the {} limit for {}.",
                    format_mb(portrait + landscape),
                    format_mb(max),
                    network.name
                ),
            })
        }
        Some(SizeLimit::Individual(max)) if portrait.max(landscape) > max => {
            Err(BatchError::AssetTooLarge {
                row: position,
                detail: format!(
                    "{} file size {} exceeds the {} per-file limit for {}.",
                    if portrait > max { "portrait" } else { "landscape" },
                    format_mb(portrait.max(landscape)),
                    format_mb(max),
                    network.name
                ),
            })
        }
        _ => Ok(()),
    }
}

/// Network list as advertised to clients.
pub fn network_catalog() -> Vec<NetworkInfo> {
    AD_NETWORKS
        .iter()
        .map(|n| NetworkInfo {
            name: n.name.to_string(),
            max_bytes: n.limit.map(|l| match l {
                SizeLimit::Combined(b) | SizeLimit::Individual(b) => b,
            }),
            limit_scope: n.limit.map(|l| match l {
                SizeLimit::Combined(_) => "combined".to_string(),
                SizeLimit::Individual(_) => "individual".to_string(),
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::upload_resolver::ResolvedAsset;
    use bytes::Bytes;

    fn resolved(portrait: usize, landscape: usize) -> ResolvedRow {
        ResolvedRow {
            portrait: ResolvedAsset {
                bytes: Bytes::from(vec![0u8; portrait]),
                media_type: "image/gif".to_string(),
            },
            landscape: ResolvedAsset {
                bytes: Bytes::from(vec![0u8; landscape]),
                media_type: "image/gif".to_string(),
            },
        }
    }

    #[test]
    fn test_find_network() {
        assert_eq!(find_network("applovin").map(|n| n.name), Some("AppLovin"));
        assert_eq!(find_network("Iron Source").map(|n| n.name), Some("IronSource"));
        assert!(find_network("MySpace").is_none());
        assert!(find_network("").is_none());
    }

    #[test]
    fn test_combined_limit() {
        let max = megabytes_tenths(34) as usize;
        assert!(check_size_limit(1, "AppLovin", &resolved(max / 2, max / 2)).is_ok());
        let err = check_size_limit(1, "AppLovin", &resolved(max / 2, max / 2 + 2)).unwrap_err();
        assert!(matches!(err, BatchError::AssetTooLarge { row: 1, .. }));
    }

    #[test]
    fn test_individual_limit() {
        let max = megabytes_tenths(14) as usize;
        // Combined size above the ceiling is fine when each file fits
        assert!(check_size_limit(2, "Facebook", &resolved(max, max)).is_ok());
        let err = check_size_limit(2, "Facebook", &resolved(10, max + 1)).unwrap_err();
        assert!(err.to_string().contains("landscape"));
    }

    #[test]
    fn test_unlimited_networks() {
        assert!(check_size_limit(1, "Moloco", &resolved(50 << 20, 50 << 20)).is_ok());
        assert!(check_size_limit(1, "Unknown", &resolved(50 << 20, 50 << 20)).is_ok());
    }

    #[test]
    fn test_catalog() {
        let catalog = network_catalog();
        assert_eq!(catalog.len(), AD_NETWORKS.len());
        let google = catalog.iter().find(|n| n.name == "Google").unwrap();
        assert_eq!(google.max_bytes, Some(1024 * 1024));
        assert_eq!(google.limit_scope.as_deref(), Some("individual"));
    }
}
