//! Scrypt chain definitions and consensus constants.

/// Scrypt proof-of-work chains the miner recognizes from a payout address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    /// Litecoin mainnet
    Litecoin,
    /// Litecoin testnet and regtest (shared address versions)
    LitecoinTestnet,
    /// Dogecoin mainnet
    Dogecoin,
    /// Dogecoin testnet
    DogecoinTestnet,
}

impl Network {
    /// All known networks, in lookup order.
    pub const ALL: [Network; 4] = [
        Network::Litecoin,
        Network::LitecoinTestnet,
        Network::Dogecoin,
        Network::DogecoinTestnet,
    ];

    /// Get the version byte for P2PKH addresses.
    pub fn p2pkh_version(&self) -> u8 {
        match self {
            Network::Litecoin => 0x30,
            Network::LitecoinTestnet => 0x6f,
            Network::Dogecoin => 0x1e,
            Network::DogecoinTestnet => 0x71,
        }
    }

    /// Get the version bytes used for P2SH addresses (current and legacy).
    pub fn p2sh_versions(&self) -> &'static [u8] {
        match self {
            Network::Litecoin => &[0x32, 0x05],
            Network::LitecoinTestnet => &[0x3a, 0xc4],
            Network::Dogecoin => &[0x16],
            Network::DogecoinTestnet => &[0xc4],
        }
    }

    /// Find the network whose P2PKH addresses use `version`.
    pub fn from_p2pkh_version(version: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|n| n.p2pkh_version() == version)
    }

    /// Whether `version` is a P2SH version byte on any known network.
    pub fn is_p2sh_version(version: u8) -> bool {
        Self::ALL.iter().any(|n| n.p2sh_versions().contains(&version))
    }

    /// Get the default JSON-RPC port for this network.
    pub fn default_rpc_port(&self) -> u16 {
        match self {
            Network::Litecoin => 9332,
            Network::LitecoinTestnet => 19332,
            Network::Dogecoin => 22555,
            Network::DogecoinTestnet => 44555,
        }
    }

    /// Get network name as string.
    pub fn name(&self) -> &'static str {
        match self {
            Network::Litecoin => "litecoin",
            Network::LitecoinTestnet => "litecoin-testnet",
            Network::Dogecoin => "dogecoin",
            Network::DogecoinTestnet => "dogecoin-testnet",
        }
    }
}

impl core::fmt::Display for Network {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Size of a block header in bytes.
pub const BLOCK_HEADER_SIZE: usize = 80;

/// Size of the header without its trailing nonce.
pub const HEADER_PREFIX_SIZE: usize = 76;

/// Number of distinct nonce values (2^32).
pub const NONCE_SPACE: u64 = 1 << 32;

/// Version of the generated coinbase transaction.
pub const COINBASE_TX_VERSION: u32 = 1;

/// Maximum size of coinbase scriptSig.
pub const MAX_COINBASE_SCRIPTSIG_SIZE: usize = 100;

/// Bytes of the scriptSig taken by the BIP34 height push (opcode + 3 bytes).
pub const HEIGHT_PUSH_SIZE: usize = 4;

/// Largest height representable by the 3-byte BIP34 push.
pub const MAX_PUSHABLE_HEIGHT: u64 = 0x00ff_ffff;

/// Default miner tag appended to the coinbase scriptSig.
pub const DEFAULT_MINER_TAG: &str = "/scrypt-solo-miner/";
