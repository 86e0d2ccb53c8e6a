use super::{CheckpointError, Checkpoints};
use crate::network::NetworkType;

/// Compiled-in mainnet checkpoints `(height, hash)`.
pub const MAINNET_CHECKPOINTS: &[(u64, &str)] = &[
    (1, "7b9b6064c13231bda96759fcabd21255af66f94ddece53695509ecb528479667"),
    (10, "7fff6b1b180abe1ade902232b0d39372dd165e82addd0a12514b69115ab29789"),
    (100, "b922e51c7cccba7f7fd12b395b942a6092566c47879862b127405dc16c3b415a"),
    (500, "4161494672a7ef39e1a1c6d5e4b3c6e899b5a945cd1dd7239ad734189c663f29"),
    (1000, "f75b44cbf1f070814ae83bb54d0d0b98ee0583633ed88b21088a3957ccb675c0"),
    (2000, "a739216d63de35fa69c74ff22c2ed201fd2d0dbe7c38a8bbdbb64368fd18aff1"),
    (3000, "0d5882e703a4e715450cc2538ead37d2ad2960c0ad9245546187c04b11ae5b4c"),
    (4000, "d66aee31dff6b06f5d6f56fdaab71247325b818968c3c555f6626969965487eb"),
    (5000, "458bf83117978a24c16e77419d450e81dc808ed8288e3ff301f3e9ff41520b0a"),
    (5353, "e96ad3449cec0f97978f1c79120d713c1753116d778b33c6d5609bed99fdd2a7"),
    (5500, "58cea8b62686f3a3c0c8f9edd30b02810cad1033ad2eea05fe47f63f0838a460"),
    (5544, "963e97cad472b7ab43676129d7eb87c0791ee0f160634ea7d26b02f29230c740"),
    (6000, "50f4c25ab0997c79f47b32aa7a766a3821e5e40935d46e03260ca1a913138df1"),
    (6500, "f26226611fcd1437882f1a3a484cc8823ea59d009cace890620c093b587b4487"),
    (7000, "522b3f918a3976bf79b4802aba906c318880d73daef5e8a3d168b59096a43f3c"),
    (8000, "ee949fccb6f4db661f5a38e4c8f487dbaf5bd18bacfb4d77b32eb3bc3abb7794"),
    (9500, "b62d0dae7be7012138af83244160797389fffb3ef2aae2ec3d91082b1a58a047"),
    (10000, "92388506769d6ee510af6f480099a1f5466a6cae855bb5c51e0bb328457cd5d4"),
    (12000, "63554dd0ae6f178f5a8bb94232e5004cae09d3d797d0953c48d0cd93b6b3743c"),
    (15622, "189a796e8fb84bdcca69cf8dc2336f0d652a11504dc9c8b5da7f217ae331e867"),
    (20000, "5507b571ba1f634810627ca2a8450b894d474762cffd79ddbfaefee3b96f22a5"),
    (32139, "b6bb051810a65fdf20c12b8b847e306e670861abeecbfb126b7eb3be55f559ac"),
    (39638, "e8d7e2d5389ed04e6beaa53dbc6707a47e76d8f86f074a434ff2e4ff74cda5f3"),
    (226000, "d4e076d8a4c23e6e51df50ae038f710fe83b1363c69b5d6c94c3d227912ff10c"),
    (263664, "3ea3ebf33bc4c73b00d28addabdf47ca2bf9b0a202f2646a01f5a9121e5d3a54"),
];

/// Test and stage networks ship without compiled checkpoints.
pub const TESTNET_CHECKPOINTS: &[(u64, &str)] = &[];
pub const STAGENET_CHECKPOINTS: &[(u64, &str)] = &[];

pub fn default_checkpoints(network: NetworkType) -> &'static [(u64, &'static str)] {
    match network {
        NetworkType::Mainnet => MAINNET_CHECKPOINTS,
        NetworkType::Testnet => TESTNET_CHECKPOINTS,
        NetworkType::Stagenet => STAGENET_CHECKPOINTS,
    }
}

/// Add the compiled checkpoints for `network` to `checkpoints`.
///
/// Returns the number of entries applied. On error, returns the failing
/// height alongside the error.
pub fn init_default_checkpoints(
    checkpoints: &mut Checkpoints,
    network: NetworkType,
) -> Result<usize, (u64, CheckpointError)> {
    let table = default_checkpoints(network);
    for (height, hash) in table {
        checkpoints
            .add_checkpoint(*height, hash, None)
            .map_err(|e| (*height, e))?;
    }
    Ok(table.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mainnet_table_is_consistent() {
        let mut cp = Checkpoints::new();
        let added = init_default_checkpoints(&mut cp, NetworkType::Mainnet).unwrap();
        assert_eq!(added, MAINNET_CHECKPOINTS.len());
        assert_eq!(cp.len(), MAINNET_CHECKPOINTS.len());
        assert_eq!(cp.max_height(), 263664);
    }

    #[test]
    fn test_mainnet_table_is_sorted_and_unique() {
        assert!(MAINNET_CHECKPOINTS.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn test_test_networks_have_no_defaults() {
        for network in [NetworkType::Testnet, NetworkType::Stagenet] {
            let mut cp = Checkpoints::new();
            assert_eq!(init_default_checkpoints(&mut cp, network).unwrap(), 0);
            assert!(cp.is_empty());
        }
    }
}
