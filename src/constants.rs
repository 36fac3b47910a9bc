use std::time::Duration;

pub const DEFAULT_RPC_URL: &str = "https://api.mainnet-beta.solana.com";
pub const DEFAULT_COMMITMENT: &str = "confirmed";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

pub const JOBS_PROGRAM_ID: &str = "nosJhNRqr2bc9g1nfGDcXXTXvYUmxD4cVwy2pMWhrYM";
pub const REWARDS_PROGRAM_ID: &str = "nosRB8DUV67oLNrL45bo2pFLrmsWPiewe2Lk2DRNYCp";
pub const NOS_MINT: &str = "nosXBVoaCTtYdLvKY6Csb4AC8JCdQKKAaWYtx2ZMoo7";

/// Delay between a failed or dropped notification channel and the next attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);
pub const DEFAULT_UNIFIED_CHANNEL_BOUND: usize = 1024;

/// `getMultipleAccounts` refuses more keys than this per request.
pub const MAX_MULTIPLE_ACCOUNTS: usize = 100;
