pub mod serializable_pubkey;
pub mod unix_timestamp;
