use crate::network::NetworkType;

/// One protocol upgrade: `version` activates at `height`.
/// `time` is the approximate unix time the fork was scheduled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardFork {
    pub version: u8,
    pub height: u64,
    pub threshold: u8,
    pub time: i64,
}

const fn fork(version: u8, height: u64, threshold: u8, time: i64) -> HardFork {
    HardFork {
        version,
        height,
        threshold,
        time,
    }
}

pub const MAINNET_HARD_FORKS: &[HardFork] = &[
    fork(1, 1, 0, 1532344521),
    fork(2, 20, 0, 1532345299),
    fork(3, 40, 0, 1532348216),
    fork(4, 60, 0, 1532351344),
    fork(5, 80, 0, 1532352706),
    fork(6, 100, 0, 1532353879),
    fork(7, 120, 0, 1532356226),
    fork(8, 5800, 0, 1541572216),
    fork(9, 5850, 0, 1541846405),
    fork(10, 5900, 0, 1542911469),
    fork(11, 5950, 0, 1556115272),
    fork(12, 6000, 0, 1556201672),
    fork(13, 152500, 0, 1605752204),
    fork(14, 550000, 0, 1654089255),
];
pub const MAINNET_VERSION_1_TILL: u64 = 1009826;

pub const TESTNET_HARD_FORKS: &[HardFork] = &[
    fork(1, 1, 0, 1341378000),
    fork(2, 15, 0, 1442763710),
    fork(3, 30, 0, 1458558528),
    fork(4, 45, 0, 1483574400),
    fork(5, 60, 0, 1489520158),
    fork(6, 75, 0, 1540190226),
    fork(7, 90, 0, 1540193826),
    fork(8, 105, 0, 1540197426),
    fork(9, 115, 0, 1540201026),
    fork(10, 130, 0, 1542903118),
    fork(11, 145, 0, 1554478208),
    fork(12, 160, 0, 1554488208),
    fork(13, 200, 0, 1605752204),
    fork(14, 260, 0, 1654089255),
];
pub const TESTNET_VERSION_1_TILL: u64 = 624633;

pub const STAGENET_HARD_FORKS: &[HardFork] = &[
    fork(1, 1, 0, 1341378000),
    fork(2, 20, 0, 1521000000),
    fork(3, 40, 0, 1521120000),
    fork(4, 60, 0, 1521240000),
    fork(5, 80, 0, 1521360000),
    fork(6, 100, 0, 1521480000),
    fork(7, 120, 0, 1521600000),
    fork(8, 140, 0, 1537821770),
    fork(9, 160, 0, 1537821771),
    fork(10, 180, 0, 1542903118),
    fork(11, 200, 0, 1554478208),
    fork(12, 220, 0, 1554488208),
    fork(13, 260, 0, 1554478208),
    fork(14, 300, 0, 1554488208),
];

pub fn hard_forks(network: NetworkType) -> &'static [HardFork] {
    match network {
        NetworkType::Mainnet => MAINNET_HARD_FORKS,
        NetworkType::Testnet => TESTNET_HARD_FORKS,
        NetworkType::Stagenet => STAGENET_HARD_FORKS,
    }
}

/// Height up to which version 1 blocks are accepted, where the network has one.
pub fn version_1_till(network: NetworkType) -> Option<u64> {
    match network {
        NetworkType::Mainnet => Some(MAINNET_VERSION_1_TILL),
        NetworkType::Testnet => Some(TESTNET_VERSION_1_TILL),
        NetworkType::Stagenet => None,
    }
}

/// Latest fork active at `height`, `None` below the first fork.
pub fn version_at(network: NetworkType, height: u64) -> Option<&'static HardFork> {
    hard_forks(network).iter().rev().find(|f| f.height <= height)
}

/// First fork scheduled strictly above `height`.
pub fn next_fork_after(network: NetworkType, height: u64) -> Option<&'static HardFork> {
    hard_forks(network).iter().find(|f| f.height > height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_are_ordered() {
        for network in [
            NetworkType::Mainnet,
            NetworkType::Testnet,
            NetworkType::Stagenet,
        ] {
            let forks = hard_forks(network);
            assert_eq!(forks.len(), 14);
            assert!(forks.windows(2).all(|w| w[0].version + 1 == w[1].version));
            assert!(forks.windows(2).all(|w| w[0].height < w[1].height));
        }
    }

    #[test]
    fn test_version_at_height() {
        assert!(version_at(NetworkType::Mainnet, 0).is_none());
        assert_eq!(version_at(NetworkType::Mainnet, 1).unwrap().version, 1);
        assert_eq!(version_at(NetworkType::Mainnet, 5849).unwrap().version, 8);
        assert_eq!(version_at(NetworkType::Mainnet, 152500).unwrap().version, 13);
        assert_eq!(version_at(NetworkType::Mainnet, u64::MAX).unwrap().version, 14);
        assert_eq!(version_at(NetworkType::Testnet, 200).unwrap().version, 13);
    }

    #[test]
    fn test_next_fork() {
        assert_eq!(
            next_fork_after(NetworkType::Mainnet, 152500).unwrap().height,
            550000
        );
        assert!(next_fork_after(NetworkType::Mainnet, 550000).is_none());
        assert_eq!(next_fork_after(NetworkType::Stagenet, 0).unwrap().version, 1);
    }

    #[test]
    fn test_version_1_till() {
        assert_eq!(version_1_till(NetworkType::Mainnet), Some(1009826));
        assert_eq!(version_1_till(NetworkType::Stagenet), None);
    }
}
